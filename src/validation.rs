//! Input validation for task sets.
//!
//! Checks structural integrity of a project's tasks before a recompute
//! pass. Detects:
//! - Duplicate IDs
//! - Tasks from more than one project
//! - Progress outside 0–100 (or not finite)
//! - Negative durations
//! - Durations and link lags beyond [`MAX_SPAN_DAYS`]
//! - Non-finite sibling order keys
//!
//! Hierarchy and dependency cycles are not checked here; the tree builder
//! and the scheduler report them with the offending id sets.

use std::collections::HashSet;

use crate::models::{Task, MAX_SPAN_DAYS};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// The set spans more than one project.
    MixedProjects,
    /// Progress is outside 0–100 or not a number.
    ProgressOutOfRange,
    /// Duration is negative.
    NegativeDuration,
    /// Duration exceeds [`MAX_SPAN_DAYS`].
    DurationTooLong,
    /// A dependency lag exceeds [`MAX_SPAN_DAYS`] in magnitude.
    LagOutOfRange,
    /// Sibling order key is NaN or infinite.
    InvalidOrder,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a project's task set.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. All tasks share one `project_id`
/// 3. Progress is finite and within 0–100
/// 4. Duration is within `0..=MAX_SPAN_DAYS`
/// 5. Link lags are within `±MAX_SPAN_DAYS`
/// 6. Order keys are finite
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(tasks: &[Task]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut task_ids = HashSet::new();
    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
    }

    if let Some(first) = tasks.first() {
        let mut reported = HashSet::new();
        for task in tasks.iter().filter(|t| t.project_id != first.project_id) {
            if reported.insert(task.project_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MixedProjects,
                    format!(
                        "Task '{}' belongs to project '{}', expected '{}'",
                        task.id, task.project_id, first.project_id
                    ),
                ));
            }
        }
    }

    for task in tasks {
        if !task.progress.is_finite() || !(0.0..=100.0).contains(&task.progress) {
            errors.push(ValidationError::new(
                ValidationErrorKind::ProgressOutOfRange,
                format!("Task '{}' has progress {}", task.id, task.progress),
            ));
        }
        if task.duration < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeDuration,
                format!("Task '{}' has negative duration {}", task.id, task.duration),
            ));
        } else if task.duration > MAX_SPAN_DAYS {
            errors.push(ValidationError::new(
                ValidationErrorKind::DurationTooLong,
                format!("Task '{}' has duration {} (max {MAX_SPAN_DAYS})", task.id, task.duration),
            ));
        }
        let lag_range = -MAX_SPAN_DAYS..=MAX_SPAN_DAYS;
        for dep in task.predecessors.iter().filter(|d| !lag_range.contains(&d.lag_days)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::LagOutOfRange,
                format!(
                    "Task '{}' has lag {} on predecessor '{}'",
                    task.id, dep.lag_days, dep.predecessor_id
                ),
            ));
        }
        if !task.order.is_finite() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidOrder,
                format!("Task '{}' has order key {}", task.id, task.order),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
