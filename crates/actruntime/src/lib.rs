//! Workflow construction and execution runtime
//!
//! This crate resolves activity kinds by type name, builds runnable
//! workflows from definitions and drives them one activity at a time.

mod factory;
mod registry;
mod runner;
mod runtime;

pub use factory::WorkflowFactory;
pub use registry::{
    ActivityCatalog, ActivityFactory, ActivityMetadata, ActivityType, ActivityTypeRegistry,
    DefaultInstanceProvider, InstanceProvider, NoFallback, QualifiedNameResolver,
    TypeNameResolver,
};
pub use runner::{RunOutcome, WorkflowRunner};
pub use runtime::{ActivityRuntime, RuntimeConfig};
