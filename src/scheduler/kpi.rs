//! Project status indicators.
//!
//! Computes summary figures for a recomputed task set and its critical
//! path report.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Project span | Working days from earliest leaf start to latest leaf end |
//! | Overall progress | Duration-weighted mean of root progress |
//! | Critical count | Leaves on the critical path |
//! | Behind schedule | Leaves ending before the status date with progress < 100 |

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::CriticalPathReport;
use crate::models::{Task, WorkCalendar};
use crate::rollup::{weighted_progress, ProgressWeighting};

/// Project-level indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectKpi {
    /// Earliest leaf start.
    pub project_start: Option<NaiveDate>,
    /// Latest leaf end.
    pub project_finish: Option<NaiveDate>,
    /// Working days between start and finish, inclusive.
    pub span_days: i64,
    /// Overall completion (0–100).
    pub overall_progress: f64,
    pub leaf_count: usize,
    pub summary_count: usize,
    pub milestone_count: usize,
    pub completed_count: usize,
    /// Leaves on the critical path.
    pub critical_count: usize,
    /// Leaves past their end date and not complete, in input order.
    pub behind_schedule: Vec<String>,
}

impl ProjectKpi {
    /// Computes indicators as of `status_date`.
    ///
    /// Summary status is taken from the task hierarchy in `tasks`, so the
    /// input should be the output of a recompute pass.
    pub fn calculate(tasks: &[Task], report: &CriticalPathReport, status_date: NaiveDate) -> Self {
        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let parents: HashSet<&str> = tasks
            .iter()
            .filter_map(|t| t.parent_id.as_deref())
            .filter(|p| ids.contains(p))
            .collect();
        let is_summary = |t: &Task| parents.contains(t.id.as_str());

        let leaves: Vec<&Task> = tasks.iter().filter(|t| !is_summary(t)).collect();
        let project_start = leaves.iter().map(|t| t.start_date).min();
        let project_finish = leaves.iter().map(|t| t.end_date).max();
        let span_days = match (project_start, project_finish) {
            (Some(s), Some(f)) => WorkCalendar::calc_duration(s, f),
            _ => 0,
        };

        let roots = tasks.iter().filter(|t| {
            t.parent_id
                .as_deref()
                .map_or(true, |p| !ids.contains(p))
        });
        let overall_progress = weighted_progress(roots, ProgressWeighting::Duration);

        let behind_schedule = leaves
            .iter()
            .filter(|t| t.end_date < status_date && t.progress < 100.0)
            .map(|t| t.id.clone())
            .collect();

        Self {
            project_start,
            project_finish,
            span_days,
            overall_progress,
            leaf_count: leaves.len(),
            summary_count: tasks.len() - leaves.len(),
            milestone_count: leaves.iter().filter(|t| t.milestone).count(),
            completed_count: leaves.iter().filter(|t| t.progress >= 100.0).count(),
            critical_count: report.critical_path.len(),
            behind_schedule,
        }
    }

    /// True when nothing is overdue.
    pub fn is_on_track(&self) -> bool {
        self.behind_schedule.is_empty()
    }
}
