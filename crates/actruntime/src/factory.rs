use crate::registry::ActivityTypeRegistry;
use actcore::{
    Activity, ActivityDefinition, ActivityGraph, ActivityState, Clock, ConnectionDefinition,
    DefaultDefinitionBuilder, DefinitionBuilder, IdGenerator, SystemClock, UuidIdGenerator,
    Variables, Workflow, WorkflowDefinitionVersion, WorkflowDescription, WorkflowError,
    WorkflowInstance,
};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds runnable workflows from definitions.
///
/// Every structural problem (disabled definition, unknown type, duplicate id,
/// dangling connection, mismatched saved instance) is reported here, so a
/// workflow that comes out of the factory is sound.
pub struct WorkflowFactory {
    registry: Arc<ActivityTypeRegistry>,
    definitions: Arc<dyn DefinitionBuilder>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl WorkflowFactory {
    pub fn new(registry: Arc<ActivityTypeRegistry>) -> Self {
        Self {
            registry,
            definitions: Arc::new(DefaultDefinitionBuilder),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_definition_builder(mut self, definitions: Arc<dyn DefinitionBuilder>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn registry(&self) -> &Arc<ActivityTypeRegistry> {
        &self.registry
    }

    /// Materialize the definition of a code-described workflow, then build it
    pub fn create_workflow_for<T>(
        &self,
        input: Option<Variables>,
        instance: Option<&WorkflowInstance>,
        correlation_id: Option<String>,
    ) -> Result<Workflow, WorkflowError>
    where
        T: WorkflowDescription + Default,
    {
        let definition = self.definitions.build(&T::default());
        self.create_workflow(definition, input, instance, correlation_id)
    }

    /// Build a workflow from a definition, optionally resuming a saved instance
    pub fn create_workflow(
        &self,
        definition: impl Into<Arc<WorkflowDefinitionVersion>>,
        input: Option<Variables>,
        instance: Option<&WorkflowInstance>,
        correlation_id: Option<String>,
    ) -> Result<Workflow, WorkflowError> {
        let definition = definition.into();
        if definition.is_disabled {
            return Err(WorkflowError::InvalidOperation(format!(
                "Cannot instantiate disabled workflow definition '{}'",
                definition.id
            )));
        }

        let activities = self.create_activities(&definition.activities)?;
        let graph = self.create_connections(activities, &definition.connections)?;

        let id = self.ids.generate();
        tracing::debug!(
            "Created workflow {} from definition {} v{} ({} activities, {} connections)",
            id,
            definition.id,
            definition.version,
            graph.node_count(),
            graph.edge_count()
        );

        let mut workflow = Workflow::new(
            id,
            definition,
            self.clock.now(),
            graph,
            input.unwrap_or_default(),
            correlation_id,
        );

        if let Some(instance) = instance {
            workflow.restore(instance)?;
            tracing::info!("Resumed workflow instance {}", workflow.id());
        }

        Ok(workflow)
    }

    fn create_activities(
        &self,
        definitions: &[ActivityDefinition],
    ) -> Result<Vec<Activity>, WorkflowError> {
        definitions
            .iter()
            .map(|definition| self.create_activity(definition))
            .collect()
    }

    fn create_activity(&self, definition: &ActivityDefinition) -> Result<Activity, WorkflowError> {
        self.registry
            .resolve_activity_with(&definition.type_name, |activity| {
                activity.set_id(definition.id.clone());
                activity.set_state(ActivityState::from_blob(&definition.state));
                activity.set_variables(definition.variables.clone());
            })
    }

    fn create_connections(
        &self,
        activities: Vec<Activity>,
        connections: &[ConnectionDefinition],
    ) -> Result<ActivityGraph, WorkflowError> {
        let mut graph = ActivityGraph::with_capacity(activities.len(), connections.len());
        let mut index: HashMap<String, NodeIndex> = HashMap::with_capacity(activities.len());

        for activity in activities {
            let id = activity.id().to_string();
            if index.contains_key(&id) {
                return Err(WorkflowError::DuplicateActivity(id));
            }
            index.insert(id, graph.add_node(activity));
        }

        for connection in connections {
            let lookup = |activity_id: &str| {
                index
                    .get(activity_id)
                    .copied()
                    .ok_or_else(|| WorkflowError::ReferentialIntegrity {
                        context: format!(
                            "connection {} -> {} ({})",
                            connection.source_activity_id,
                            connection.destination_activity_id,
                            connection.outcome
                        ),
                        activity_id: activity_id.to_string(),
                    })
            };
            let source = lookup(&connection.source_activity_id)?;
            let target = lookup(&connection.destination_activity_id)?;
            graph.add_edge(source, target, connection.outcome.clone());
        }

        Ok(graph)
    }
}
