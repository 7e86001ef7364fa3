use crate::{Value, Variables, WorkflowExpression, DONE_OUTCOME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared node of a workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Opaque state blob; copied into the runtime activity on build
    #[serde(default)]
    pub state: serde_json::Map<String, serde_json::Value>,
    /// Node-local scope
    #[serde(default)]
    pub variables: Variables,
}

impl ActivityDefinition {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            state: serde_json::Map::new(),
            variables: Variables::new(),
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    pub fn with_expression(self, key: impl Into<String>, expression: WorkflowExpression) -> Self {
        let value = serde_json::json!({
            "syntax": expression.syntax,
            "expression": expression.expression,
        });
        self.with_state(key, value)
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.set(name, value);
        self
    }
}

/// Declared edge of a workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    pub source_activity_id: String,
    pub destination_activity_id: String,
    #[serde(default = "default_outcome")]
    pub outcome: String,
}

fn default_outcome() -> String {
    DONE_OUTCOME.to_string()
}

impl ConnectionDefinition {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            source_activity_id: source.into(),
            destination_activity_id: destination.into(),
            outcome: outcome.into(),
        }
    }
}

/// Immutable, declarative description of a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinitionVersion {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
    #[serde(default)]
    pub is_disabled: bool,
}

fn default_version() -> u32 {
    1
}

impl WorkflowDefinitionVersion {
    pub fn find_activity(&self, id: &str) -> Option<&ActivityDefinition> {
        self.activities.iter().find(|a| a.id == id)
    }
}

/// Fluent construction of a [`WorkflowDefinitionVersion`]
#[derive(Debug, Clone)]
pub struct WorkflowDefinitionBuilder {
    definition: WorkflowDefinitionVersion,
}

impl WorkflowDefinitionBuilder {
    pub fn new() -> Self {
        Self {
            definition: WorkflowDefinitionVersion {
                id: Uuid::new_v4().simple().to_string(),
                version: default_version(),
                name: None,
                activities: Vec::new(),
                connections: Vec::new(),
                is_disabled: false,
            },
        }
    }

    pub fn with_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.definition.id = id.into();
        self
    }

    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.definition.name = Some(name.into());
        self
    }

    pub fn with_version(&mut self, version: u32) -> &mut Self {
        self.definition.version = version;
        self
    }

    pub fn disabled(&mut self, is_disabled: bool) -> &mut Self {
        self.definition.is_disabled = is_disabled;
        self
    }

    pub fn activity(&mut self, activity: ActivityDefinition) -> &mut Self {
        self.definition.activities.push(activity);
        self
    }

    pub fn connect(
        &mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        outcome: impl Into<String>,
    ) -> &mut Self {
        self.definition
            .connections
            .push(ConnectionDefinition::new(source, destination, outcome));
        self
    }

    pub fn build(&self) -> WorkflowDefinitionVersion {
        self.definition.clone()
    }
}

impl Default for WorkflowDefinitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A workflow described in code rather than loaded from storage
pub trait WorkflowDescription {
    fn describe(&self, builder: &mut WorkflowDefinitionBuilder);
}

/// Materializes a definition from a [`WorkflowDescription`]
pub trait DefinitionBuilder: Send + Sync {
    fn build(&self, description: &dyn WorkflowDescription) -> WorkflowDefinitionVersion;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDefinitionBuilder;

impl DefinitionBuilder for DefaultDefinitionBuilder {
    fn build(&self, description: &dyn WorkflowDescription) -> WorkflowDefinitionVersion {
        let mut builder = WorkflowDefinitionBuilder::new();
        description.describe(&mut builder);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_outcome_defaults_to_done() {
        let conn: ConnectionDefinition = serde_json::from_value(json!({
            "source_activity_id": "a",
            "destination_activity_id": "b"
        }))
        .unwrap();
        assert_eq!(conn.outcome, "Done");
    }

    #[test]
    fn test_definition_from_json() {
        let def: WorkflowDefinitionVersion = serde_json::from_value(json!({
            "id": "wf",
            "activities": [
                {"id": "a", "type": "WriteLine", "state": {"textExpression": {"syntax": "Literal", "expression": "hi"}}},
                {"id": "b", "type": "Finish", "variables": {"luna": {"type": "String", "value": "moon"}}}
            ],
            "connections": [{"source_activity_id": "a", "destination_activity_id": "b", "outcome": "Done"}]
        }))
        .unwrap();

        assert_eq!(def.version, 1);
        assert!(!def.is_disabled);
        assert_eq!(def.activities.len(), 2);
        assert_eq!(
            def.find_activity("b").and_then(|b| b.variables.get("luna")),
            Some(&Value::from("moon"))
        );
    }

    struct TwoSteps;

    impl WorkflowDescription for TwoSteps {
        fn describe(&self, builder: &mut WorkflowDefinitionBuilder) {
            builder
                .with_id("two-steps")
                .activity(ActivityDefinition::new("a", "WriteLine"))
                .activity(ActivityDefinition::new("b", "Finish"))
                .connect("a", "b", DONE_OUTCOME);
        }
    }

    #[test]
    fn test_default_definition_builder() {
        let def = DefaultDefinitionBuilder.build(&TwoSteps);
        assert_eq!(def.id, "two-steps");
        assert_eq!(def.connections, vec![ConnectionDefinition::new("a", "b", "Done")]);
    }
}
