use crate::runtime::RuntimeConfig;
use actcore::{
    ActivityError, ActivityExecutionResult, ActivitySlot, ExecutionContext, ExpressionEvaluator,
    FlowError, Variables, Workflow, WorkflowStatus,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

/// Walks a built workflow one activity at a time and applies the results
pub struct WorkflowRunner {
    evaluator: Arc<dyn ExpressionEvaluator>,
    config: RuntimeConfig,
}

/// Summary of one call to [`WorkflowRunner::run`]
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: WorkflowStatus,
    /// Activity ids in the order they ran
    pub executed: Vec<String>,
    pub blocking: Vec<String>,
    pub duration_ms: u64,
}

impl WorkflowRunner {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>, config: RuntimeConfig) -> Self {
        Self { evaluator, config }
    }

    /// Run until nothing is scheduled, an activity faults, the run is
    /// finished or halted, or `cancellation` fires.
    ///
    /// A fresh workflow starts at its start activities; a resumed one picks up
    /// its cursor, or re-enters its blocking activities when the cursor is empty.
    pub async fn run(
        &self,
        workflow: &mut Workflow,
        launch: &Variables,
        cancellation: &CancellationToken,
    ) -> Result<RunOutcome, FlowError> {
        match workflow.status() {
            WorkflowStatus::Finished | WorkflowStatus::Faulted => {
                return Err(FlowError::Execution(format!(
                    "Workflow {} already completed with status {:?}",
                    workflow.id(),
                    workflow.status()
                )));
            }
            _ => {}
        }

        let start_time = Instant::now();
        let mut scheduled: VecDeque<String> = if !workflow.cursor().is_empty() {
            workflow.cursor().iter().cloned().collect()
        } else if !workflow.blocking().is_empty() {
            workflow.blocking().iter().cloned().collect()
        } else {
            workflow
                .start_activities()
                .into_iter()
                .map(|a| a.id().to_string())
                .collect()
        };

        tracing::info!("Starting workflow run: {}", workflow.id());
        workflow.set_status(WorkflowStatus::Running);

        let mut executed = Vec::new();
        let mut steps = 0usize;

        while let Some(activity_id) = scheduled.pop_front() {
            if cancellation.is_cancelled() {
                scheduled.push_front(activity_id);
                workflow.set_status(WorkflowStatus::Cancelled);
                break;
            }

            if steps >= self.config.max_steps {
                scheduled.push_front(activity_id);
                workflow.set_fault(format!("Step limit of {} reached", self.config.max_steps));
                break;
            }
            steps += 1;

            let resuming = workflow.is_blocking(&activity_id);
            let result = self
                .execute_activity(workflow, &activity_id, launch, cancellation, resuming)
                .await;

            let result = match result {
                Ok(result) => result,
                Err(e) if e.is_cancellation() => {
                    tracing::warn!("Activity {} cancelled", activity_id);
                    scheduled.push_front(activity_id);
                    workflow.set_status(WorkflowStatus::Cancelled);
                    break;
                }
                Err(e) => {
                    tracing::error!("Activity {} failed: {}", activity_id, e);
                    workflow.set_fault(format!("Activity {} failed: {}", activity_id, e));
                    break;
                }
            };

            executed.push(activity_id.clone());
            tracing::debug!("Activity {} returned {:?}", activity_id, result);

            match result {
                ActivityExecutionResult::Noop => {
                    workflow.remove_blocking(&activity_id);
                }
                ActivityExecutionResult::Outcomes(outcomes) => {
                    workflow.remove_blocking(&activity_id);
                    for outcome in &outcomes {
                        for next in workflow.outbound(&activity_id, outcome) {
                            scheduled.push_back(next.id().to_string());
                        }
                    }
                }
                ActivityExecutionResult::Halt => {
                    workflow.add_blocking(activity_id);
                }
                ActivityExecutionResult::Fault(message) => {
                    tracing::error!("Activity {} faulted the workflow: {}", activity_id, message);
                    workflow.set_fault(message);
                    break;
                }
                ActivityExecutionResult::Finish => {
                    scheduled.clear();
                    for id in workflow.blocking().to_vec() {
                        workflow.remove_blocking(&id);
                    }
                    workflow.set_status(WorkflowStatus::Finished);
                    break;
                }
            }
        }

        if workflow.status() == WorkflowStatus::Running {
            if workflow.blocking().is_empty() {
                workflow.set_status(WorkflowStatus::Finished);
            } else {
                workflow.set_status(WorkflowStatus::Halted);
            }
        }
        workflow.set_cursor(scheduled.into_iter().collect());

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            "Workflow {} stopped with status {:?} after {} activities in {}ms",
            workflow.id(),
            workflow.status(),
            executed.len(),
            duration_ms
        );

        Ok(RunOutcome {
            status: workflow.status(),
            executed,
            blocking: workflow.blocking().to_vec(),
            duration_ms,
        })
    }

    /// Execute one activity and commit its staged writes. Nothing is
    /// committed when the activity errors, is cancelled or times out.
    async fn execute_activity(
        &self,
        workflow: &mut Workflow,
        activity_id: &str,
        launch: &Variables,
        cancellation: &CancellationToken,
        resuming: bool,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let ActivitySlot {
            activity,
            input,
            workflow_id,
            correlation_id,
        } = workflow.slot(activity_id).ok_or_else(|| {
            ActivityError::ExecutionFailed(format!("Activity {} is not part of the workflow", activity_id))
        })?;

        tracing::info!(
            "Executing activity {} ({}){}",
            activity_id,
            activity.type_name(),
            if resuming { " [resume]" } else { "" }
        );

        let mut ctx = ExecutionContext::new(input, launch, self.evaluator.clone())
            .with_identity(workflow_id, correlation_id)
            .with_activity(activity_id, activity.variables().clone())
            .with_cancellation(cancellation.clone());

        let run = async {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(ActivityError::Cancelled),
                result = async {
                    if resuming {
                        activity.resume(&mut ctx).await
                    } else {
                        activity.execute(&mut ctx).await
                    }
                } => result,
            }
        };

        let result = match self.config.activity_timeout_ms {
            Some(millis) => timeout(Duration::from_millis(millis), run)
                .await
                .unwrap_or(Err(ActivityError::Timeout { millis })),
            None => run.await,
        }?;

        let writes = ctx.into_writes();
        workflow.apply_writes(&writes);
        Ok(result)
    }
}
