use actcore::{
    ActivityBehavior, ActivityError, ActivityExecutionResult, ActivityFrame, ExecutionContext,
    NamedActivity, StateProperty, WorkflowExpression,
};
use actruntime::{ActivityFactory, ActivityMetadata};
use async_trait::async_trait;

/// Branch on a boolean expression: outcome `True` or `False`
pub struct IfElse;

impl IfElse {
    pub const CONDITION_EXPRESSION: StateProperty<WorkflowExpression> =
        StateProperty::new("conditionExpression");
    pub const TRUE_OUTCOME: &'static str = "True";
    pub const FALSE_OUTCOME: &'static str = "False";
}

impl NamedActivity for IfElse {
    const TYPE_NAME: &'static str = "IfElse";
}

#[async_trait]
impl ActivityBehavior for IfElse {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let condition = Self::CONDITION_EXPRESSION.require(frame.state)?;
        let taken: bool = ctx.evaluate_as(&condition, ctx.cancellation()).await?;

        Ok(ActivityExecutionResult::outcome(if taken {
            Self::TRUE_OUTCOME
        } else {
            Self::FALSE_OUTCOME
        }))
    }
}

/// Halts until the named variable is visible and truthy
pub struct Signaled;

impl Signaled {
    pub const SIGNAL: StateProperty<String> = StateProperty::new("signal");

    fn check(
        frame: &ActivityFrame<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let signal = Self::SIGNAL.require(frame.state)?;
        let received = ctx
            .get_variable(&signal)
            .map(|value| value.is_truthy())
            .unwrap_or(false);

        if received {
            Ok(ActivityExecutionResult::done())
        } else {
            tracing::debug!(activity = %frame.id, "waiting for signal {}", signal);
            Ok(ActivityExecutionResult::Halt)
        }
    }
}

impl NamedActivity for Signaled {
    const TYPE_NAME: &'static str = "Signaled";
}

#[async_trait]
impl ActivityBehavior for Signaled {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Self::check(frame, ctx)
    }
}

pub struct Fault;

impl Fault {
    pub const MESSAGE: StateProperty<String> = StateProperty::new("message");
}

impl NamedActivity for Fault {
    const TYPE_NAME: &'static str = "Fault";
}

#[async_trait]
impl ActivityBehavior for Fault {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let message = Self::MESSAGE
            .get(frame.state)?
            .unwrap_or_else(|| "Faulted".to_string());
        Ok(ActivityExecutionResult::fault(message))
    }
}

pub struct Finish;

impl NamedActivity for Finish {
    const TYPE_NAME: &'static str = "Finish";
}

#[async_trait]
impl ActivityBehavior for Finish {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::Finish)
    }
}

pub struct IfElseFactory;

impl ActivityFactory for IfElseFactory {
    fn type_name(&self) -> &str {
        IfElse::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(IfElse))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Branch on a boolean condition".to_string(),
            category: "control".to_string(),
        }
    }
}

pub struct SignaledFactory;

impl ActivityFactory for SignaledFactory {
    fn type_name(&self) -> &str {
        Signaled::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(Signaled))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Suspend until a signal variable is set".to_string(),
            category: "control".to_string(),
        }
    }
}

pub struct FaultFactory;

impl ActivityFactory for FaultFactory {
    fn type_name(&self) -> &str {
        Fault::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(Fault))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Fault the workflow with a message".to_string(),
            category: "control".to_string(),
        }
    }
}

pub struct FinishFactory;

impl ActivityFactory for FinishFactory {
    fn type_name(&self) -> &str {
        Finish::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(Finish))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Complete the workflow".to_string(),
            category: "control".to_string(),
        }
    }
}
