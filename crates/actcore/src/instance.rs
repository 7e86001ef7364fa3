use crate::{ActivityState, Variables, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Saved runtime state of one activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityInstance {
    pub state: ActivityState,
    #[serde(default)]
    pub output: Variables,
}

/// Snapshot of a workflow run, handed to and received from persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: String,
    pub definition_id: String,
    pub version: u32,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: WorkflowStatus,
    /// Workflow-input scope at the time of the snapshot
    #[serde(default)]
    pub scope: Variables,
    #[serde(default)]
    pub activities: HashMap<String, ActivityInstance>,
    /// Activities still scheduled, next first
    #[serde(default)]
    pub cursor: Vec<String>,
    #[serde(default)]
    pub blocking: Vec<String>,
    #[serde(default)]
    pub fault: Option<String>,
}
