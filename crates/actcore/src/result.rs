use serde::{Deserialize, Serialize};

pub const DONE_OUTCOME: &str = "Done";

/// What an activity asks the engine to do after it ran.
///
/// Results are inert; the invoking engine decides how to apply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ActivityExecutionResult {
    /// Nothing to apply: no outcome is selected and no scope is touched.
    Noop,
    /// Follow the outbound connections labelled with any of these outcomes.
    Outcomes(Vec<String>),
    /// Suspend the run with this activity blocking until it is resumed.
    Halt,
    /// Fault the run.
    Fault(String),
    /// Complete the run, dropping anything still scheduled.
    Finish,
}

impl ActivityExecutionResult {
    pub fn done() -> Self {
        Self::outcome(DONE_OUTCOME)
    }

    pub fn outcome(outcome: impl Into<String>) -> Self {
        Self::Outcomes(vec![outcome.into()])
    }

    pub fn outcomes<I, S>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Outcomes(outcomes.into_iter().map(Into::into).collect())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }

    /// Outcomes the engine should follow; empty for every non-branching variant.
    pub fn selected_outcomes(&self) -> &[String] {
        match self {
            Self::Outcomes(outcomes) => outcomes,
            _ => &[],
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}
