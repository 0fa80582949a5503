//! Error types for the scheduling engine.
//!
//! Only fatal conditions are errors. Recoverable anomalies (orphans,
//! dangling predecessors, pinned-task violations, malformed predecessor
//! text) are reported through [`Diagnostics`](crate::models::Diagnostics).

use thiserror::Error;

use crate::validation::ValidationError;

/// The `parent_id` hierarchy contains a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("hierarchy cycle through task {task_id}: {}", .chain.join(" -> "))]
pub struct HierarchyCycleError {
    /// First task found revisiting its own ancestor chain.
    pub task_id: String,
    /// Ancestor chain ending at the revisited task.
    pub chain: Vec<String>,
}

/// The predecessor graph contains a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle among tasks [{}]", .task_ids.join(", "))]
pub struct SchedulingCycleError {
    /// Tasks on (or between) cycles, sorted.
    pub task_ids: Vec<String>,
}

/// Fatal engine error. The recompute pass produces no result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    HierarchyCycle(#[from] HierarchyCycleError),

    #[error(transparent)]
    SchedulingCycle(#[from] SchedulingCycleError),

    #[error("invalid task set: {}", join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    DuplicateTask(String),

    #[error("summary task {0} has derived dates and progress")]
    SummaryNotEditable(String),

    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("work order {record_id} is not linked to task {task_id}")]
    UnlinkedWorkOrder { task_id: String, record_id: String },
}

impl EngineError {
    /// Task ids implicated in a cycle, if this is a cycle error.
    pub fn cycle_ids(&self) -> Option<&[String]> {
        match self {
            Self::HierarchyCycle(e) => Some(&e.chain),
            Self::SchedulingCycle(e) => Some(&e.task_ids),
            _ => None,
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
