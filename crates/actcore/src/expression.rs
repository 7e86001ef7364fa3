use crate::{ExpressionError, Value, Variables};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const LITERAL_SYNTAX: &str = "Literal";
pub const VARIABLE_SYNTAX: &str = "Variable";
pub const JSON_SYNTAX: &str = "Json";

/// An expression as stored in activity state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowExpression {
    pub syntax: String,
    pub expression: String,
}

impl WorkflowExpression {
    pub fn new(syntax: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            syntax: syntax.into(),
            expression: expression.into(),
        }
    }

    pub fn literal(expression: impl Into<String>) -> Self {
        Self::new(LITERAL_SYNTAX, expression)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(VARIABLE_SYNTAX, name)
    }

    pub fn json(expression: impl Into<String>) -> Self {
        Self::new(JSON_SYNTAX, expression)
    }
}

/// Evaluates expressions against the variables visible to an activity
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        expression: &WorkflowExpression,
        variables: &Variables,
    ) -> Result<Value, ExpressionError>;
}

/// Evaluator for the `Literal`, `Variable` and `Json` syntaxes
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

#[async_trait]
impl ExpressionEvaluator for DefaultEvaluator {
    async fn evaluate(
        &self,
        expression: &WorkflowExpression,
        variables: &Variables,
    ) -> Result<Value, ExpressionError> {
        let text = expression.expression.as_str();
        match expression.syntax.as_str() {
            LITERAL_SYNTAX => Ok(serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from_json)
                .unwrap_or_else(|_| Value::String(text.to_string()))),
            VARIABLE_SYNTAX => Ok(variables.get(text.trim()).cloned().unwrap_or(Value::Null)),
            JSON_SYNTAX => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from_json)
                .map_err(|e| ExpressionError::Evaluation {
                    expression: text.to_string(),
                    reason: e.to_string(),
                }),
            other => Err(ExpressionError::UnsupportedSyntax(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_falls_back_to_string() {
        let vars = Variables::new();
        let number = DefaultEvaluator
            .evaluate(&WorkflowExpression::literal("-4.5"), &vars)
            .await
            .unwrap();
        assert_eq!(number, Value::Number(-4.5));

        let text = DefaultEvaluator
            .evaluate(&WorkflowExpression::literal("hello world"), &vars)
            .await
            .unwrap();
        assert_eq!(text, Value::from("hello world"));
    }

    #[tokio::test]
    async fn test_variable_lookup_missing_is_null() {
        let vars = Variables::new().with("x", 1.0);
        let hit = DefaultEvaluator
            .evaluate(&WorkflowExpression::variable("x"), &vars)
            .await
            .unwrap();
        assert_eq!(hit, Value::Number(1.0));

        let miss = DefaultEvaluator
            .evaluate(&WorkflowExpression::variable("y"), &vars)
            .await
            .unwrap();
        assert!(miss.is_null());
    }

    #[tokio::test]
    async fn test_strict_json_and_unknown_syntax() {
        let vars = Variables::new();
        assert!(matches!(
            DefaultEvaluator
                .evaluate(&WorkflowExpression::json("{oops"), &vars)
                .await,
            Err(ExpressionError::Evaluation { .. })
        ));
        assert_eq!(
            DefaultEvaluator
                .evaluate(&WorkflowExpression::new("JavaScript", "1 + 1"), &vars)
                .await,
            Err(ExpressionError::UnsupportedSyntax("JavaScript".to_string()))
        );
    }
}
