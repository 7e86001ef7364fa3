//! Core abstractions for the activity workflow engine
//!
//! This crate provides the definition records, the runtime graph model, the
//! three-tier variable scoping used during execution and the result protocol
//! activities speak. It has no knowledge of how activity kinds are resolved.

mod activity;
mod context;
mod definition;
mod error;
mod expression;
mod instance;
mod result;
mod services;
mod value;
mod workflow;

pub use activity::{
    Activity, ActivityBehavior, ActivityFrame, ActivityId, ActivityState, NamedActivity,
    StateProperty,
};
pub use context::ExecutionContext;
pub use definition::{
    ActivityDefinition, ConnectionDefinition, DefaultDefinitionBuilder, DefinitionBuilder,
    WorkflowDefinitionBuilder, WorkflowDefinitionVersion, WorkflowDescription,
};
pub use error::{ActivityError, ExpressionError, FlowError, TypeResolutionError, WorkflowError};
pub use expression::{
    DefaultEvaluator, ExpressionEvaluator, WorkflowExpression, JSON_SYNTAX, LITERAL_SYNTAX,
    VARIABLE_SYNTAX,
};
pub use instance::{ActivityInstance, WorkflowInstance};
pub use result::{ActivityExecutionResult, DONE_OUTCOME};
pub use services::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
pub use value::{Value, Variables};
pub use workflow::{
    ActivityGraph, ActivitySlot, Connection, Workflow, WorkflowId, WorkflowStatus,
};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
