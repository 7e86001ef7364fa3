#![allow(dead_code)]

use actcore::{
    ActivityBehavior, ActivityError, ActivityExecutionResult, ActivityFrame, Clock,
    ExecutionContext, IdGenerator, StateProperty, Value, WorkflowExpression,
};
use actruntime::{ActivityFactory, ActivityTypeRegistry, WorkflowFactory};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const KEY: StateProperty<String> = StateProperty::new("key");
pub const EXPRESSION: StateProperty<WorkflowExpression> = StateProperty::new("expression");
pub const OUTCOME: StateProperty<String> = StateProperty::new("outcome");

/// Writes the evaluated `expression` to workflow variable `key`
pub struct Assign;

#[async_trait]
impl ActivityBehavior for Assign {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let key = KEY.require(frame.state)?;
        let expression = EXPRESSION.require(frame.state)?;
        let cancellation = ctx.cancellation().clone();
        ctx.evaluate_into(key, &expression, &cancellation).await?;
        Ok(ActivityExecutionResult::done())
    }
}

/// Copies the visible value of `key` into its output under the same name
pub struct Read;

#[async_trait]
impl ActivityBehavior for Read {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        let key = KEY.require(frame.state)?;
        let value = ctx.get_variable(&key).unwrap_or(Value::Null);
        frame.output.set(key, value);
        Ok(ActivityExecutionResult::done())
    }
}

/// Returns the outcome named in state
pub struct Branch;

#[async_trait]
impl ActivityBehavior for Branch {
    async fn execute(
        &self,
        frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::outcome(OUTCOME.require(frame.state)?))
    }
}

pub struct Noop;

#[async_trait]
impl ActivityBehavior for Noop {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::Noop)
    }
}

/// Halts on first execution, completes when resumed
pub struct Wait;

#[async_trait]
impl ActivityBehavior for Wait {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::Halt)
    }

    async fn resume(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::done())
    }
}

/// Halts on first execution, returns no outcome when resumed
pub struct Pause;

#[async_trait]
impl ActivityBehavior for Pause {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::Halt)
    }

    async fn resume(
        &self,
        _frame: &mut ActivityFrame<'_>,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        Ok(ActivityExecutionResult::Noop)
    }
}

/// Stages a write, then fails
pub struct Explode;

#[async_trait]
impl ActivityBehavior for Explode {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        ctx.set_variable("partial", true);
        Err(ActivityError::ExecutionFailed("boom".to_string()))
    }
}

/// Stages a write, then never completes
pub struct Hang;

#[async_trait]
impl ActivityBehavior for Hang {
    async fn execute(
        &self,
        _frame: &mut ActivityFrame<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<ActivityExecutionResult, ActivityError> {
        ctx.set_variable("partial", true);
        std::future::pending().await
    }
}

pub struct TestFactory {
    name: &'static str,
    build: fn() -> Box<dyn ActivityBehavior>,
}

impl ActivityFactory for TestFactory {
    fn type_name(&self) -> &str {
        self.name
    }

    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        Ok((self.build)())
    }
}

pub fn test_catalog() -> Vec<Arc<dyn ActivityFactory>> {
    let kinds: [(&'static str, fn() -> Box<dyn ActivityBehavior>); 8] = [
        ("Assign", || Box::new(Assign)),
        ("Read", || Box::new(Read)),
        ("Branch", || Box::new(Branch)),
        ("Noop", || Box::new(Noop)),
        ("Wait", || Box::new(Wait)),
        ("Pause", || Box::new(Pause)),
        ("Explode", || Box::new(Explode)),
        ("Hang", || Box::new(Hang)),
    ];
    kinds
        .into_iter()
        .map(|(name, build)| Arc::new(TestFactory { name, build }) as Arc<dyn ActivityFactory>)
        .collect()
}

pub fn test_registry() -> ActivityTypeRegistry {
    ActivityTypeRegistry::new(test_catalog)
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("wf-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

pub fn test_factory() -> WorkflowFactory {
    WorkflowFactory::new(Arc::new(test_registry()))
        .with_clock(Arc::new(FixedClock(fixed_time())))
        .with_id_generator(Arc::new(SequentialIds::default()))
}
