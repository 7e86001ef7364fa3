use actcore::{
    ActivityBehavior, ActivityError, ActivityExecutionResult, ActivityFrame, ExecutionContext,
    NamedActivity, StateProperty, Value, WorkflowExpression,
};
use actruntime::{ActivityFactory, ActivityMetadata};
use async_trait::async_trait;

/// Logs the evaluated text and keeps it in output `Text`
pub struct WriteLine;

impl WriteLine {
    pub const TEXT_EXPRESSION: StateProperty<WorkflowExpression> =
        StateProperty::new("textExpression");
    pub const TEXT: &'static str = "Text";
}

impl NamedActivity for WriteLine {
    const TYPE_NAME: &'static str = "WriteLine";
}

#[async_trait]
impl ActivityBehavior for WriteLine {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let text = match Self::TEXT_EXPRESSION.get(frame.state)? {
            Some(expression) => match ctx.evaluate(&expression, ctx.cancellation()).await? {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_json().to_string(),
            },
            None => String::new(),
        };

        tracing::info!(activity = %frame.id, "{}", text);
        frame.output.set(Self::TEXT, text);
        Ok(ActivityExecutionResult::done())
    }
}

pub struct WriteLineFactory;

impl ActivityFactory for WriteLineFactory {
    fn type_name(&self) -> &str {
        WriteLine::TYPE_NAME
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok(Box::new(WriteLine))
    }

    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata {
            description: "Log a line of text".to_string(),
            category: "console".to_string(),
        }
    }
}
