//! Standard activity library
//!
//! Collection of built-in activity kinds for common workflow steps

mod console;
mod control_flow;
mod math;
mod variables;

pub use console::WriteLine;
pub use control_flow::{Fault, Finish, IfElse, Signaled};
pub use math::Absolute;
pub use variables::SetVariable;

use actruntime::{ActivityFactory, ActivityTypeRegistry, QualifiedNameResolver};
use std::sync::Arc;

/// Path prefix under which the standard kinds resolve by qualified name
pub const QUALIFIED_PREFIX: &str = "activities";

/// Factories for every standard activity kind
pub fn catalog() -> Vec<Arc<dyn ActivityFactory>> {
    let factories: [Arc<dyn ActivityFactory>; 7] = [
        Arc::new(math::AbsoluteFactory),
        Arc::new(variables::SetVariableFactory),
        Arc::new(console::WriteLineFactory),
        Arc::new(control_flow::IfElseFactory),
        Arc::new(control_flow::SignaledFactory),
        Arc::new(control_flow::FaultFactory),
        Arc::new(control_flow::FinishFactory),
    ];
    factories.into()
}

/// Fallback resolver accepting `activities::<Kind>` names
pub fn qualified_catalog() -> QualifiedNameResolver {
    QualifiedNameResolver::from_factories(QUALIFIED_PREFIX, catalog())
}

/// Registry over the standard kinds, with qualified-name fallback
pub fn standard_registry() -> ActivityTypeRegistry {
    ActivityTypeRegistry::new(catalog).with_fallback(qualified_catalog())
}
