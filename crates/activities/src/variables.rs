use actcore::{
    ActivityBehavior, ActivityError, ActivityExecutionResult, ActivityFrame, ExecutionContext,
    NamedActivity, StateProperty, WorkflowExpression,
};
use actruntime::{ActivityFactory, ActivityMetadata};
use async_trait::async_trait;

/// Evaluate an expression into a workflow variable
pub struct SetVariable;

impl SetVariable {
    pub const VARIABLE_NAME: StateProperty<String> = StateProperty::new("variableName");
    pub const VALUE_EXPRESSION: StateProperty<WorkflowExpression> =
        StateProperty::new("valueExpression");
}

impl NamedActivity for SetVariable {
    const TYPE_NAME: &'static str = "SetVariable";
}

#[async_trait]
impl ActivityBehavior for SetVariable {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let name = Self::VARIABLE_NAME.require(frame.state)?;
        if name.is_empty() {
            return Err(ActivityError::InvalidState {
                key: Self::VARIABLE_NAME.key().to_string(),
                reason: "variable name is empty".to_string(),
            });
        }
        let expression = Self::VALUE_EXPRESSION.require(frame.state)?;

        let cancellation = ctx.cancellation().clone();
        ctx.evaluate_into(name, &expression, &cancellation).await?;
        Ok(ActivityExecutionResult::done())
    }
}

pub struct SetVariableFactory;

impl ActivityFactory for SetVariableFactory {
    fn type_name(&self) -> &str {
        SetVariable::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(SetVariable))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Write an evaluated expression into the workflow input scope".to_string(),
            category: "variables".to_string(),
        }
    }
}
