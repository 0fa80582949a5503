//! Project task model.
//!
//! A task is one row of the work breakdown structure. Leaf tasks carry
//! authoritative dates, duration and progress; summary tasks (tasks with
//! children) have those fields derived from their children.
//!
//! # Time Representation
//! Dates are calendar days (`NaiveDate`). `duration` counts working days
//! and `end_date` is inclusive, kept equal to
//! `WorkCalendar::calc_end_date(start_date, duration)`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Dependency, WorkCalendar};

/// Completion status derived from progress.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Status implied by a progress percentage.
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 100.0 {
            Self::Completed
        } else if progress > 0.0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

/// A project task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier within the project.
    pub id: String,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// Parent task; `None` = root.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Sibling sort key (integer or fractional).
    #[serde(default)]
    pub order: f64,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Responsible person.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Zero-duration marker.
    #[serde(default)]
    pub milestone: bool,
    /// Linked external work-order record.
    #[serde(default)]
    pub linked_record_id: Option<String>,
    /// First working day (inclusive).
    pub start_date: NaiveDate,
    /// Last working day (inclusive).
    pub end_date: NaiveDate,
    /// Working days.
    #[serde(default)]
    pub duration: i64,
    /// Completion percentage (0–100).
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: TaskStatus,
    /// Parsed predecessor links.
    #[serde(default)]
    pub predecessors: Vec<Dependency>,
    /// Raw predecessor expression awaiting parse (or kept after a parse failure).
    #[serde(default)]
    pub predecessor_text: Option<String>,
    /// Keep `start_date` fixed even when predecessors move.
    #[serde(default)]
    pub manual_pin: bool,

    // Derived on every recompute.
    #[serde(default)]
    pub wbs_code: String,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub total_slack_days: Option<i64>,
    #[serde(default)]
    pub early_start: Option<NaiveDate>,
    #[serde(default)]
    pub early_finish: Option<NaiveDate>,
    #[serde(default)]
    pub late_start: Option<NaiveDate>,
    #[serde(default)]
    pub late_finish: Option<NaiveDate>,
}

impl Task {
    /// Creates a 1-day root task starting at `start_date`.
    pub fn new(id: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            project_id: String::new(),
            parent_id: None,
            order: 0.0,
            name: String::new(),
            assignee: None,
            milestone: false,
            linked_record_id: None,
            start_date,
            end_date: start_date,
            duration: 1,
            progress: 0.0,
            status: TaskStatus::NotStarted,
            predecessors: Vec::new(),
            predecessor_text: None,
            manual_pin: false,
            wbs_code: String::new(),
            is_summary: false,
            is_critical: false,
            total_slack_days: None,
            early_start: None,
            early_finish: None,
            late_start: None,
            late_finish: None,
        }
    }

    /// Sets the owning project.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// Sets the parent task.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the sibling sort key.
    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Sets the duration in working days and recomputes the end date.
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self.milestone = duration == 0 && self.milestone;
        self.sync_end_date();
        self
    }

    /// Marks the task as a zero-duration milestone.
    pub fn as_milestone(mut self) -> Self {
        self.milestone = true;
        self.duration = 0;
        self.sync_end_date();
        self
    }

    /// Sets progress (0–100) and the derived status.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.set_progress(progress);
        self
    }

    /// Adds a predecessor link.
    pub fn with_predecessor(mut self, dependency: Dependency) -> Self {
        self.predecessors.push(dependency);
        self
    }

    /// Sets a raw predecessor expression to be parsed on the next recompute.
    pub fn with_predecessor_text(mut self, text: impl Into<String>) -> Self {
        self.predecessor_text = Some(text.into());
        self
    }

    /// Pins the start date.
    pub fn pinned(mut self) -> Self {
        self.manual_pin = true;
        self
    }

    /// Links an external work-order record.
    pub fn with_linked_record(mut self, record_id: impl Into<String>) -> Self {
        self.linked_record_id = Some(record_id.into());
        self
    }

    /// Effective duration: milestones always have zero.
    pub fn effective_duration(&self) -> i64 {
        if self.milestone {
            0
        } else {
            self.duration.max(0)
        }
    }

    /// Recomputes `end_date` from `start_date` and duration.
    pub fn sync_end_date(&mut self) {
        self.end_date = WorkCalendar::calc_end_date(self.start_date, self.effective_duration());
    }

    /// Moves the task so it starts at `start`, keeping its duration.
    pub fn move_to(&mut self, start: NaiveDate) {
        self.start_date = start;
        self.sync_end_date();
    }

    /// Sets progress and the status it implies.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = progress;
        self.status = TaskStatus::from_progress(progress);
    }

    /// Clears every derived field before a recompute pass.
    pub fn clear_derived(&mut self) {
        self.wbs_code.clear();
        self.is_summary = false;
        self.is_critical = false;
        self.total_slack_days = None;
        self.early_start = None;
        self.early_finish = None;
        self.late_start = None;
        self.late_finish = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyType;

    fn mon() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("T1", mon())
            .with_project("P1")
            .with_parent("T0")
            .with_order(2.5)
            .with_name("Pour foundation")
            .with_assignee("kim")
            .with_duration(3)
            .with_progress(40.0)
            .with_predecessor(Dependency::new("T9").with_type(DependencyType::SS))
            .with_linked_record("WO-1")
            .pinned();

        assert_eq!(task.id, "T1");
        assert_eq!(task.project_id, "P1");
        assert_eq!(task.parent_id.as_deref(), Some("T0"));
        assert_eq!(task.end_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.predecessors.len(), 1);
        assert_eq!(task.linked_record_id.as_deref(), Some("WO-1"));
        assert!(task.manual_pin);
    }

    #[test]
    fn test_milestone_has_zero_duration() {
        let task = Task::new("M", mon()).with_duration(4).as_milestone();
        assert_eq!(task.effective_duration(), 0);
        assert_eq!(task.start_date, task.end_date);
    }

    #[test]
    fn test_move_keeps_duration() {
        let mut task = Task::new("T", mon()).with_duration(2);
        task.move_to(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(task.end_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(task.duration, 2);
    }

    #[test]
    fn test_status_from_progress() {
        assert_eq!(TaskStatus::from_progress(0.0), TaskStatus::NotStarted);
        assert_eq!(TaskStatus::from_progress(0.5), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from_progress(100.0), TaskStatus::Completed);
    }

    #[test]
    fn test_task_deserialize_minimal() {
        let task: Task = serde_json::from_str(
            r#"{"id":"1","start_date":"2024-01-01","end_date":"2024-01-02","duration":2}"#,
        )
        .unwrap();
        assert_eq!(task.duration, 2);
        assert!(task.parent_id.is_none());
        assert!(task.predecessors.is_empty());
        assert_eq!(task.status, TaskStatus::NotStarted);
    }
}
