//! Linked work-order records and task intents.
//!
//! Work orders live in an external store. The engine only consumes their
//! status snapshots ([`WorkOrderRecord`]) and emits [`TaskIntent`]s that the
//! host turns into create/update calls against that store.

use serde::{Deserialize, Serialize};

/// Status of an external work order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkOrderStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

/// Snapshot of an external work-order record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrderRecord {
    pub id: String,
    pub status: WorkOrderStatus,
    /// Completion percentage reported by the work order, if any.
    #[serde(default)]
    pub completion: Option<f64>,
}

impl WorkOrderRecord {
    /// Creates a record with no completion figure.
    pub fn new(id: impl Into<String>, status: WorkOrderStatus) -> Self {
        Self {
            id: id.into(),
            status,
            completion: None,
        }
    }

    /// Sets the completion percentage.
    pub fn with_completion(mut self, completion: f64) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Task progress implied by this record, given the task's current progress.
    ///
    /// Returns `None` when the record carries no progress information
    /// (cancelled work orders). A non-finite completion counts as absent.
    pub fn implied_progress(&self, current: f64) -> Option<f64> {
        let reported = self
            .completion
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 100.0));
        match self.status {
            WorkOrderStatus::Completed => Some(100.0),
            WorkOrderStatus::Open => Some(reported.unwrap_or(0.0)),
            WorkOrderStatus::InProgress => Some(reported.unwrap_or(current)),
            WorkOrderStatus::Cancelled => None,
        }
    }
}

/// Outbound request for the work-order layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", rename_all = "kebab-case")]
pub enum TaskIntent {
    /// A task's progress changed.
    ProgressChanged {
        task_id: String,
        linked_record_id: Option<String>,
        progress: f64,
    },
    /// A task reached 100%.
    Completed {
        task_id: String,
        linked_record_id: Option<String>,
    },
}

impl TaskIntent {
    /// Task the intent refers to.
    pub fn task_id(&self) -> &str {
        match self {
            Self::ProgressChanged { task_id, .. } | Self::Completed { task_id, .. } => task_id,
        }
    }
}
