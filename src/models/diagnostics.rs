//! Recompute diagnostics.
//!
//! Every anomaly the engine recovers from (or refuses on) is reported as a
//! structured record in [`Diagnostics`], returned alongside the task array.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which graph a cycle was found in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CycleKind {
    /// `parent_id` hierarchy.
    Hierarchy,
    /// Predecessor dependency graph.
    Dependency,
}

/// A cycle and the task ids implicated in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub task_ids: Vec<String>,
}

/// A pinned task that cannot satisfy its dependency constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub task_id: String,
    /// Start the task keeps.
    pub pinned_start: NaiveDate,
    /// Earliest start its predecessors allow.
    pub required_start: NaiveDate,
}

impl ConstraintViolation {
    /// Working days the pinned start is ahead of what its predecessors allow.
    pub fn shortfall_days(&self) -> i64 {
        super::WorkCalendar::working_days_between(self.pinned_start, self.required_start)
    }
}

/// A predecessor link to a task that does not exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DanglingPredecessor {
    pub task_id: String,
    pub predecessor_id: String,
}

/// A `parent_id` that points to a missing or foreign-project task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrphanReference {
    pub task_id: String,
    pub parent_id: String,
}

/// A predecessor expression that failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseFailure {
    pub task_id: String,
    pub text: String,
    pub message: String,
}

/// Why a task was left out of critical path analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    /// No dependency edge touches the task or its ancestors.
    Unlinked,
    /// The task lies on or behind a dependency cycle.
    Cyclic,
}

/// A task excluded from critical path analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExcludedTask {
    pub task_id: String,
    pub reason: ExclusionReason,
}

/// All diagnostics from one recompute pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostics {
    pub cycles: Vec<CycleReport>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub dangling_predecessors: Vec<DanglingPredecessor>,
    pub orphan_references: Vec<OrphanReference>,
    pub parse_failures: Vec<ParseFailure>,
    pub excluded_from_critical_path: Vec<ExcludedTask>,
}

impl Diagnostics {
    /// Creates an empty diagnostics set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing at all was reported.
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty()
            && self.constraint_violations.is_empty()
            && self.dangling_predecessors.is_empty()
            && self.orphan_references.is_empty()
            && self.parse_failures.is_empty()
            && self.excluded_from_critical_path.is_empty()
    }

    /// Whether a fatal cycle was reported.
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Appends everything from `other`.
    pub fn merge(&mut self, other: Diagnostics) {
        self.cycles.extend(other.cycles);
        self.constraint_violations.extend(other.constraint_violations);
        self.dangling_predecessors.extend(other.dangling_predecessors);
        self.orphan_references.extend(other.orphan_references);
        self.parse_failures.extend(other.parse_failures);
        self.excluded_from_critical_path
            .extend(other.excluded_from_critical_path);
    }
}
