use crate::{ExpressionError, ExpressionEvaluator, Value, Variables, WorkflowExpression};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Variable scoping and expression evaluation for one activity execution.
///
/// Lookups walk the scopes in precedence order:
///
/// 1. workflow-input scope (including writes staged by the running activity)
/// 2. launch scope, injected by the engine for this run
/// 3. node-local scope of the running activity
///
/// Writes always target the workflow-input scope. They are staged on the
/// context and only reach the workflow once the engine commits them via
/// [`ExecutionContext::into_writes`], so an aborted activity never leaves a
/// scope half-written.
pub struct ExecutionContext<'a> {
    workflow_id: &'a str,
    correlation_id: Option<&'a str>,
    activity_id: String,
    workflow_input: &'a Variables,
    launch: &'a Variables,
    local: Variables,
    staged: Variables,
    evaluator: Arc<dyn ExpressionEvaluator>,
    cancellation: CancellationToken,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        workflow_input: &'a Variables,
        launch: &'a Variables,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Self {
        Self {
            workflow_id: "",
            correlation_id: None,
            activity_id: String::new(),
            workflow_input,
            launch,
            local: Variables::new(),
            staged: Variables::new(),
            evaluator,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_identity(mut self, workflow_id: &'a str, correlation_id: Option<&'a str>) -> Self {
        self.workflow_id = workflow_id;
        self.correlation_id = correlation_id;
        self
    }

    /// Enter an activity: its id and node-local scope become visible.
    pub fn with_activity(mut self, activity_id: impl Into<String>, local: Variables) -> Self {
        self.activity_id = activity_id.into();
        self.local = local;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn workflow_id(&self) -> &str {
        self.workflow_id
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Cancellation signal of the run this activity belongs to
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.staged
            .get(name)
            .or_else(|| self.workflow_input.get(name))
            .or_else(|| self.launch.get(name))
            .or_else(|| self.local.get(name))
            .cloned()
    }

    /// Upsert into the workflow-input scope. Last writer wins.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        tracing::debug!(activity = %self.activity_id, variable = %name, "set workflow variable");
        self.staged.set(name, value);
    }

    /// Copy the currently visible value of `name` into the workflow-input
    /// scope. Returns `false` when nothing by that name is visible.
    pub fn promote(&mut self, name: &str) -> bool {
        match self.get_variable(name) {
            Some(value) => {
                self.set_variable(name, value);
                true
            }
            None => false,
        }
    }

    /// Flatten all scopes into one map, higher-precedence scopes winning.
    pub fn visible_variables(&self) -> Variables {
        let mut visible = self.local.clone();
        visible.extend_from(self.launch);
        visible.extend_from(self.workflow_input);
        visible.extend_from(&self.staged);
        visible
    }

    pub async fn evaluate(
        &self,
        expression: &WorkflowExpression,
        cancellation: &CancellationToken,
    ) -> Result<Value, ExpressionError> {
        if cancellation.is_cancelled() {
            return Err(ExpressionError::Cancelled);
        }

        let visible = self.visible_variables();
        tracing::debug!(
            activity = %self.activity_id,
            syntax = %expression.syntax,
            "evaluating expression"
        );

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(ExpressionError::Cancelled),
            result = self.evaluator.evaluate(expression, &visible) => result,
        }
    }

    pub async fn evaluate_as<T: DeserializeOwned>(
        &self,
        expression: &WorkflowExpression,
        cancellation: &CancellationToken,
    ) -> Result<T, ExpressionError> {
        let value = self.evaluate(expression, cancellation).await?;
        serde_json::from_value(value.to_json()).map_err(|e| ExpressionError::Coercion {
            expected: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    /// Evaluate and, only if evaluation succeeds, write the result to the
    /// workflow-input scope under `name`.
    pub async fn evaluate_into(
        &mut self,
        name: impl Into<String>,
        expression: &WorkflowExpression,
        cancellation: &CancellationToken,
    ) -> Result<Value, ExpressionError> {
        let value = self.evaluate(expression, cancellation).await?;
        self.set_variable(name, value.clone());
        Ok(value)
    }

    pub fn staged_writes(&self) -> &Variables {
        &self.staged
    }

    /// Hand the staged workflow-input writes to the engine for commit.
    pub fn into_writes(self) -> Variables {
        self.staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultEvaluator;
    use async_trait::async_trait;

    fn evaluator() -> Arc<dyn ExpressionEvaluator> {
        Arc::new(DefaultEvaluator)
    }

    #[test]
    fn test_precedence_input_then_launch_then_local() {
        let input = Variables::new().with("shared", "input");
        let launch = Variables::new().with("shared", "launch").with("glo", "launch");
        let local = Variables::new()
            .with("shared", "local")
            .with("glo", "local")
            .with("luna", "local");

        let ctx = ExecutionContext::new(&input, &launch, evaluator()).with_activity("a", local);

        assert_eq!(ctx.get_variable("shared"), Some(Value::from("input")));
        assert_eq!(ctx.get_variable("glo"), Some(Value::from("launch")));
        assert_eq!(ctx.get_variable("luna"), Some(Value::from("local")));
        assert_eq!(ctx.get_variable("missing"), None);
    }

    #[test]
    fn test_write_shadows_launch_value() {
        let input = Variables::new();
        let launch = Variables::new().with("glo", "launch");
        let mut ctx = ExecutionContext::new(&input, &launch, evaluator());

        ctx.set_variable("glo", "rewritten");
        assert_eq!(ctx.get_variable("glo"), Some(Value::from("rewritten")));
        assert_eq!(ctx.into_writes().get("glo"), Some(&Value::from("rewritten")));
    }

    #[test]
    fn test_promote_copies_local_into_writes() {
        let input = Variables::new();
        let launch = Variables::new();
        let mut ctx = ExecutionContext::new(&input, &launch, evaluator())
            .with_activity("a", Variables::new().with("luna", 7.0));

        assert!(ctx.staged_writes().is_empty());
        assert!(ctx.promote("luna"));
        assert!(!ctx.promote("nothing"));
        assert_eq!(ctx.staged_writes().get("luna"), Some(&Value::Number(7.0)));
    }

    #[tokio::test]
    async fn test_evaluate_sees_staged_writes() {
        let input = Variables::new();
        let launch = Variables::new();
        let mut ctx = ExecutionContext::new(&input, &launch, evaluator());
        let token = CancellationToken::new();

        ctx.set_variable("x", 3.0);
        let value = ctx
            .evaluate(&WorkflowExpression::variable("x"), &token)
            .await
            .unwrap();
        assert_eq!(value, Value::Number(3.0));
    }

    #[tokio::test]
    async fn test_evaluate_as_reports_coercion() {
        let input = Variables::new().with("x", "text");
        let launch = Variables::new();
        let ctx = ExecutionContext::new(&input, &launch, evaluator());
        let token = CancellationToken::new();

        let err = ctx
            .evaluate_as::<f64>(&WorkflowExpression::variable("x"), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Coercion { .. }));
    }

    struct Pending;

    #[async_trait]
    impl ExpressionEvaluator for Pending {
        async fn evaluate(
            &self,
            _expression: &WorkflowExpression,
            _variables: &Variables,
        ) -> Result<Value, ExpressionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_evaluation_writes_nothing() {
        let input = Variables::new();
        let launch = Variables::new();
        let mut ctx = ExecutionContext::new(&input, &launch, Arc::new(Pending));
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = ctx
            .evaluate_into("x", &WorkflowExpression::literal("1"), &token)
            .await;
        assert_eq!(result, Err(ExpressionError::Cancelled));
        assert!(ctx.get_variable("x").is_none());
        assert!(ctx.into_writes().is_empty());
    }
}
