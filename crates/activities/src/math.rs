use actcore::{
    ActivityBehavior, ActivityError, ActivityExecutionResult, ActivityFrame, ExecutionContext,
    NamedActivity, StateProperty, WorkflowExpression,
};
use actruntime::{ActivityFactory, ActivityMetadata};
use async_trait::async_trait;

/// Absolute value of a numeric expression, written to output `Result`
pub struct Absolute;

impl Absolute {
    pub const VALUE_EXPRESSION: StateProperty<WorkflowExpression> =
        StateProperty::new("valueExpression");
    pub const RESULT: &'static str = "Result";
}

impl NamedActivity for Absolute {
    const TYPE_NAME: &'static str = "Absolute";
}

#[async_trait]
impl ActivityBehavior for Absolute {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let expression = Self::VALUE_EXPRESSION.require(frame.state)?;
        let value: f64 = ctx.evaluate_as(&expression, ctx.cancellation()).await?;

        frame.output.set(Self::RESULT, value.abs());
        Ok(ActivityExecutionResult::done())
    }
}

pub struct AbsoluteFactory;

impl ActivityFactory for AbsoluteFactory {
    fn type_name(&self) -> &str {
        Absolute::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(Absolute))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Absolute value of a numeric expression".to_string(),
            category: "math".to_string(),
        }
    }
}
