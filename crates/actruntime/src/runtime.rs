use crate::{ActivityTypeRegistry, RunOutcome, WorkflowFactory, WorkflowRunner};
use actcore::{
    DefaultEvaluator, ExpressionEvaluator, FlowError, Variables, Workflow,
    WorkflowDefinitionVersion, WorkflowError, WorkflowInstance,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ties the registry, the workflow factory and the runner together
pub struct ActivityRuntime {
    registry: Arc<ActivityTypeRegistry>,
    factory: WorkflowFactory,
    runner: WorkflowRunner,
    config: RuntimeConfig,
}

impl ActivityRuntime {
    /// Create a new runtime with default settings
    pub fn new(registry: ActivityTypeRegistry) -> Self {
        Self::with_config(registry, RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(registry: ActivityTypeRegistry, config: RuntimeConfig) -> Self {
        let registry = Arc::new(registry);
        let factory = WorkflowFactory::new(registry.clone());
        let runner = WorkflowRunner::new(Arc::new(DefaultEvaluator), config.clone());
        Self {
            registry,
            factory,
            runner,
            config,
        }
    }

    /// Swap the workflow factory, e.g. to inject a clock or id generator
    pub fn with_factory(mut self, configure: impl FnOnce(WorkflowFactory) -> WorkflowFactory) -> Self {
        let factory = WorkflowFactory::new(self.registry.clone());
        self.factory = configure(factory);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.runner = WorkflowRunner::new(evaluator, self.config.clone());
        self
    }

    pub fn registry(&self) -> &Arc<ActivityTypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn factory(&self) -> &WorkflowFactory {
        &self.factory
    }

    pub fn create_workflow(
        &self,
        definition: impl Into<Arc<WorkflowDefinitionVersion>>,
        input: Option<Variables>,
        instance: Option<&WorkflowInstance>,
        correlation_id: Option<String>,
    ) -> Result<Workflow, WorkflowError> {
        self.factory
            .create_workflow(definition, input, instance, correlation_id)
    }

    pub async fn run(
        &self,
        workflow: &mut Workflow,
        launch: &Variables,
        cancellation: &CancellationToken,
    ) -> Result<RunOutcome, FlowError> {
        self.runner.run(workflow, launch, cancellation).await
    }

    /// Build a workflow and run it to its first stop
    pub async fn execute(
        &self,
        definition: impl Into<Arc<WorkflowDefinitionVersion>>,
        input: Variables,
        launch: &Variables,
        correlation_id: Option<String>,
    ) -> Result<(Workflow, RunOutcome), FlowError> {
        let mut workflow = self.create_workflow(definition, Some(input), None, correlation_id)?;
        let outcome = self
            .run(&mut workflow, launch, &CancellationToken::new())
            .await?;
        Ok((workflow, outcome))
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound on activities executed in one run; guards against cycles
    pub max_steps: usize,
    /// Per-activity execution timeout
    pub activity_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            activity_timeout_ms: None,
        }
    }
}
