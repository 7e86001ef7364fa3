use crate::{
    Activity, ActivityInstance, Variables, WorkflowDefinitionVersion, WorkflowError,
    WorkflowInstance,
};
use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type WorkflowId = String;

/// Runtime graph: activities as nodes, outcome labels on the edges
pub type ActivityGraph = DiGraph<Activity, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Idle,
    Running,
    Halted,
    Finished,
    Faulted,
    Cancelled,
}

/// Directed, outcome-labelled edge between two activities of one workflow
#[derive(Debug, Clone, Copy)]
pub struct Connection<'a> {
    pub source: &'a Activity,
    pub target: &'a Activity,
    pub outcome: &'a str,
}

/// Everything an engine needs to execute one activity: the activity itself
/// and a read view of the workflow it belongs to.
pub struct ActivitySlot<'a> {
    pub activity: &'a mut Activity,
    pub input: &'a Variables,
    pub workflow_id: &'a str,
    pub correlation_id: Option<&'a str>,
}

/// Executable instance of a workflow definition
#[derive(Debug)]
pub struct Workflow {
    id: WorkflowId,
    definition: Arc<WorkflowDefinitionVersion>,
    created_at: DateTime<Utc>,
    graph: ActivityGraph,
    index: HashMap<String, NodeIndex>,
    input: Variables,
    correlation_id: Option<String>,
    status: WorkflowStatus,
    cursor: Vec<String>,
    blocking: Vec<String>,
    fault: Option<String>,
}

impl Workflow {
    /// Assemble a workflow from an already-linked graph. Activity ids in the
    /// graph are expected to be unique.
    pub fn new(
        id: impl Into<WorkflowId>,
        definition: Arc<WorkflowDefinitionVersion>,
        created_at: DateTime<Utc>,
        graph: ActivityGraph,
        input: Variables,
        correlation_id: Option<String>,
    ) -> Self {
        let index = graph
            .node_indices()
            .map(|idx| (graph[idx].id().to_string(), idx))
            .collect();

        Self {
            id: id.into(),
            definition,
            created_at,
            graph,
            index,
            input,
            correlation_id,
            status: WorkflowStatus::Idle,
            cursor: Vec::new(),
            blocking: Vec::new(),
            fault: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn definition(&self) -> &Arc<WorkflowDefinitionVersion> {
        &self.definition
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn graph(&self) -> &ActivityGraph {
        &self.graph
    }

    /// Activities in definition order
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.graph.node_weights()
    }

    pub fn activity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn activity_mut(&mut self, id: &str) -> Option<&mut Activity> {
        let idx = *self.index.get(id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Connections in definition order
    pub fn connections(&self) -> impl Iterator<Item = Connection<'_>> {
        self.graph.edge_references().map(move |edge| Connection {
            source: &self.graph[edge.source()],
            target: &self.graph[edge.target()],
            outcome: edge.weight().as_str(),
        })
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Targets of the connections leaving `activity_id` labelled `outcome`,
    /// in definition order.
    pub fn outbound(&self, activity_id: &str, outcome: &str) -> Vec<&Activity> {
        let Some(&idx) = self.index.get(activity_id) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|edge| edge.weight() == outcome)
            .collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| &self.graph[edge.target()])
            .collect()
    }

    /// Activities without inbound connections, in definition order. A graph
    /// where every node has an inbound edge starts at its first activity.
    pub fn start_activities(&self) -> Vec<&Activity> {
        let roots: Vec<&Activity> = self
            .graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.graph[idx])
            .collect();

        if roots.is_empty() {
            self.graph.node_weights().take(1).collect()
        } else {
            roots
        }
    }

    /// Workflow-input scope
    pub fn input(&self) -> &Variables {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Variables {
        &mut self.input
    }

    /// Commit writes staged by an activity into the workflow-input scope.
    pub fn apply_writes(&mut self, writes: &Variables) {
        self.input.extend_from(writes);
    }

    pub fn slot(&mut self, activity_id: &str) -> Option<ActivitySlot<'_>> {
        let idx = *self.index.get(activity_id)?;
        Some(ActivitySlot {
            activity: self.graph.node_weight_mut(idx)?,
            input: &self.input,
            workflow_id: &self.id,
            correlation_id: self.correlation_id.as_deref(),
        })
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn set_fault(&mut self, message: impl Into<String>) {
        self.status = WorkflowStatus::Faulted;
        self.fault = Some(message.into());
    }

    /// Activities still scheduled, next first
    pub fn cursor(&self) -> &[String] {
        &self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Vec<String>) {
        self.cursor = cursor;
    }

    pub fn blocking(&self) -> &[String] {
        &self.blocking
    }

    pub fn is_blocking(&self, activity_id: &str) -> bool {
        self.blocking.iter().any(|id| id == activity_id)
    }

    pub fn add_blocking(&mut self, activity_id: impl Into<String>) {
        let activity_id = activity_id.into();
        if !self.is_blocking(&activity_id) {
            self.blocking.push(activity_id);
        }
    }

    pub fn remove_blocking(&mut self, activity_id: &str) {
        self.blocking.retain(|id| id != activity_id);
    }

    /// Rehydrate runtime state from a saved instance. Every id the instance
    /// names is checked against the graph before anything is changed.
    pub fn restore(&mut self, instance: &WorkflowInstance) -> Result<(), WorkflowError> {
        if instance.definition_id != self.definition.id {
            return Err(WorkflowError::InvalidOperation(format!(
                "instance {} belongs to definition '{}', not '{}'",
                instance.id, instance.definition_id, self.definition.id
            )));
        }

        let referenced = instance
            .activities
            .keys()
            .map(|id| ("activity snapshot", id))
            .chain(instance.cursor.iter().map(|id| ("cursor", id)))
            .chain(instance.blocking.iter().map(|id| ("blocking list", id)));
        for (context, id) in referenced {
            if !self.index.contains_key(id) {
                return Err(WorkflowError::ReferentialIntegrity {
                    context: format!("saved instance {} {}", instance.id, context),
                    activity_id: id.clone(),
                });
            }
        }

        for (id, saved) in &instance.activities {
            if let Some(activity) = self.activity_mut(id) {
                activity.set_state(saved.state.clone());
                *activity.output_mut() = saved.output.clone();
            }
        }

        self.id = instance.id.clone();
        self.created_at = instance.created_at;
        self.correlation_id = instance.correlation_id.clone();
        self.input = instance.scope.clone();
        self.status = instance.status;
        self.cursor = instance.cursor.clone();
        self.blocking = instance.blocking.clone();
        self.fault = instance.fault.clone();
        Ok(())
    }

    /// Capture runtime state for a persistence collaborator.
    pub fn snapshot(&self) -> WorkflowInstance {
        WorkflowInstance {
            id: self.id.clone(),
            definition_id: self.definition.id.clone(),
            version: self.definition.version,
            correlation_id: self.correlation_id.clone(),
            created_at: self.created_at,
            status: self.status,
            scope: self.input.clone(),
            activities: self
                .activities()
                .map(|a| {
                    (
                        a.id().to_string(),
                        ActivityInstance {
                            state: a.state().clone(),
                            output: a.output().clone(),
                        },
                    )
                })
                .collect(),
            cursor: self.cursor.clone(),
            blocking: self.blocking.clone(),
            fault: self.fault.clone(),
        }
    }
}
