use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Activity error: {0}")]
    Activity(#[from] ActivityError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to map an activity type name onto a known activity kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeResolutionError {
    #[error("No such activity type: {0}")]
    Unknown(String),

    #[error("Unparsable activity type name '{name}': {reason}")]
    Unparsable { name: String, reason: String },
}

/// Structural failures raised while turning a definition into a workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Referential integrity violated: {context} references unknown activity '{activity_id}'")]
    ReferentialIntegrity { context: String, activity_id: String },

    #[error("Duplicate activity id: {0}")]
    DuplicateActivity(String),

    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),

    #[error("Failed to activate '{type_name}': {reason}")]
    Activation { type_name: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unsupported expression syntax: {0}")]
    UnsupportedSyntax(String),

    #[error("Evaluation failed for '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },

    #[error("Cannot coerce expression result to {expected}: {reason}")]
    Coercion { expected: String, reason: String },

    #[error("Evaluation cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("Missing required state property: {0}")]
    MissingState(String),

    #[error("Invalid state property '{key}': {reason}")]
    InvalidState { key: String, reason: String },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Activity initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Cancelled")]
    Cancelled,
}

impl ActivityError {
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ActivityError::Cancelled | ActivityError::Expression(ExpressionError::Cancelled)
        )
    }
}
