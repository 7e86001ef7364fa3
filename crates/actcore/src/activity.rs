use crate::{ActivityError, ActivityExecutionResult, ExecutionContext, Value, Variables};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

pub type ActivityId = String;

/// Behaviour shared by every kind of activity.
///
/// Implementations hold no per-node data; everything a node owns lives on
/// [`Activity`] and is handed to the behaviour through an [`ActivityFrame`].
#[async_trait]
pub trait ActivityBehavior: Send + Sync {
    /// Run the activity for the first time in a workflow run
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError>;

    /// Continue an activity that previously halted. Defaults to re-running `execute`.
    async fn resume(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        self.execute(frame, ctx).await
    }
}

/// Implemented by activity kinds that declare their own type name, so callers
/// can resolve them without spelling the string.
pub trait NamedActivity {
    const TYPE_NAME: &'static str;
}

/// The mutable parts of an activity visible to its behaviour during a run
pub struct ActivityFrame<'a> {
    pub id: &'a str,
    pub state: &'a mut ActivityState,
    pub output: &'a mut Variables,
}

/// Runtime node of a workflow graph
pub struct Activity {
    id: ActivityId,
    type_name: String,
    state: ActivityState,
    output: Variables,
    variables: Variables,
    behavior: Box<dyn ActivityBehavior>,
}

impl Activity {
    pub fn new(type_name: impl Into<String>, behavior: Box<dyn ActivityBehavior>) -> Self {
        Self {
            id: String::new(),
            type_name: type_name.into(),
            state: ActivityState::default(),
            output: Variables::new(),
            variables: Variables::new(),
            behavior,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<ActivityId>) {
        self.id = id.into();
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ActivityState {
        &mut self.state
    }

    pub fn set_state(&mut self, state: ActivityState) {
        self.state = state;
    }

    /// Values this activity produced. Private to the node; other nodes only see
    /// them when an engine or expression routes them explicitly.
    pub fn output(&self) -> &Variables {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Variables {
        &mut self.output
    }

    /// Node-local scope, fixed at design time
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn set_variables(&mut self, variables: Variables) {
        self.variables = variables;
    }

    pub async fn execute(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let (behavior, mut frame) = self.split();
        behavior.execute(&mut frame, ctx).await
    }

    pub async fn resume(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let (behavior, mut frame) = self.split();
        behavior.resume(&mut frame, ctx).await
    }

    fn split(&mut self) -> (&dyn ActivityBehavior, ActivityFrame<'_>) {
        let Activity {
            id,
            state,
            output,
            behavior,
            ..
        } = self;
        (
            &**behavior,
            ActivityFrame {
                id: id.as_str(),
                state,
                output,
            },
        )
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("state", &self.state)
            .field("output", &self.output)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// Schema-less state bag owned by one activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityState {
    entries: HashMap<String, Value>,
}

impl ActivityState {
    /// Deep-copy a declared state blob.
    pub fn from_blob(blob: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            entries: blob
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
                .collect(),
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Typed read. `Ok(None)` when the key is absent or null.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ActivityError> {
        match self.entries.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.to_json())
                .map(Some)
                .map_err(|e| ActivityError::InvalidState {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), ActivityError> {
        let key = key.into();
        let json = serde_json::to_value(value).map_err(|e| ActivityError::InvalidState {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.entries.insert(key, Value::from_json(json));
        Ok(())
    }
}

/// Strongly-typed view of one key in an [`ActivityState`].
///
/// Activity kinds declare these as constants, e.g.
/// `const VALUE: StateProperty<WorkflowExpression> = StateProperty::new("valueExpression");`
pub struct StateProperty<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateProperty<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl<T: Serialize + DeserializeOwned> StateProperty<T> {
    pub fn get(&self, state: &ActivityState) -> Result<Option<T>, ActivityError> {
        state.get(self.key)
    }

    pub fn require(&self, state: &ActivityState) -> Result<T, ActivityError> {
        self.get(state)?
            .ok_or_else(|| ActivityError::MissingState(self.key.to_string()))
    }

    pub fn set(&self, state: &mut ActivityState, value: &T) -> Result<(), ActivityError> {
        state.set(self.key, value)
    }
}
