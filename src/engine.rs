//! Recompute pipeline.
//!
//! [`Engine::recompute`] is the single entry point for user edits. It takes
//! the full task set of one project plus an optional [`TaskEdit`] and runs:
//!
//! 1. apply the edit and validate the result
//! 2. build the task tree (orphans are promoted to roots)
//! 3. number the tree (WBS codes, summary flags)
//! 4. parse pending predecessor expressions
//! 5. auto-schedule through the dependency graph
//! 6. critical path analysis
//! 7. summary rollup and intents for changed progress
//!
//! The engine holds no state besides its configuration. A fatal error
//! (cycle, invalid input, rejected edit) yields a [`Rejection`] carrying the
//! untouched input, so the caller can keep showing the last consistent
//! schedule.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::edit::{apply_edit, TaskEdit};
use crate::error::{EngineError, HierarchyCycleError};
use crate::models::{
    CycleKind, CycleReport, Diagnostics, LagUnit, ParseFailure, Task, TaskIntent, WorkCalendar,
    WorkOrderRecord,
};
use crate::predecessor::parse_predecessors;
use crate::rollup::{
    calculate_summary_dates, progress_intents, sync_progress_from_work_order, ProgressWeighting,
};
use crate::scheduler::{calculate_critical_path, AutoScheduler, CriticalPathReport, ProjectKpi};
use crate::tree::{apply_wbs, TaskTree};
use crate::validation::validate_input;

/// Engine policy.
///
/// # Example
///
/// ```
/// use u_wbs::engine::EngineConfig;
/// use u_wbs::models::LagUnit;
///
/// let config = EngineConfig::from_json_str(r#"{ "lag_unit": "calendar-days" }"#).unwrap();
/// assert_eq!(config.lag_unit, LagUnit::CalendarDays);
/// assert_eq!(config.critical_slack_days, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Unit of dependency lags.
    pub lag_unit: LagUnit,
    /// Weighting of children's progress in summaries.
    pub progress_weighting: ProgressWeighting,
    /// Tasks with at most this much slack are critical.
    pub critical_slack_days: i64,
}

impl EngineConfig {
    /// Default policy: working-day lags, duration weighting, zero-slack critical.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lag_unit(mut self, lag_unit: LagUnit) -> Self {
        self.lag_unit = lag_unit;
        self
    }

    pub fn with_progress_weighting(mut self, weighting: ProgressWeighting) -> Self {
        self.progress_weighting = weighting;
        self
    }

    pub fn with_critical_slack_days(mut self, days: i64) -> Self {
        self.critical_slack_days = days;
        self
    }

    /// Loads a configuration from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Calendar implied by this configuration.
    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar::new().with_lag_unit(self.lag_unit)
    }
}

/// Output of a successful recompute pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recomputation {
    /// Every task of the project, in input order (created tasks last).
    pub tasks: Vec<Task>,
    /// Recovered anomalies.
    pub diagnostics: Diagnostics,
    /// Requests for the work-order layer.
    pub intents: Vec<TaskIntent>,
    pub critical_path: CriticalPathReport,
}

impl Recomputation {
    /// Looks up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Project indicators as of `status_date`.
    pub fn kpi(&self, status_date: NaiveDate) -> ProjectKpi {
        ProjectKpi::calculate(&self.tasks, &self.critical_path, status_date)
    }
}

/// A recompute pass that produced no schedule.
#[derive(Error, Debug, Clone)]
#[error("recompute rejected: {error}")]
pub struct Rejection {
    #[source]
    pub error: EngineError,
    /// The input task set, unchanged.
    pub previous: Vec<Task>,
    /// Diagnostics gathered before the failure; cycles land in `cycles`.
    pub diagnostics: Diagnostics,
}

/// Stateless scheduling engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies `edit` (if any) and recomputes every derived field.
    ///
    /// Deterministic: the same input yields the same output, and running
    /// the pass again on its own output without an edit changes nothing.
    ///
    /// # Errors
    /// A [`Rejection`] holding the unchanged input when the edit is invalid,
    /// the edited set fails validation, or either the hierarchy or the
    /// dependency graph has a cycle.
    pub fn recompute(
        &self,
        tasks: &[Task],
        edit: Option<&TaskEdit>,
    ) -> Result<Recomputation, Rejection> {
        let mut diagnostics = Diagnostics::new();
        match self.run(tasks, edit, &mut diagnostics) {
            Ok((tasks, intents, critical_path)) => Ok(Recomputation {
                tasks,
                diagnostics,
                intents,
                critical_path,
            }),
            Err(error) => {
                warn!(%error, "recompute rejected, keeping previous schedule");
                Err(Rejection {
                    error,
                    previous: tasks.to_vec(),
                    diagnostics,
                })
            }
        }
    }

    /// Applies a linked work order's state to one task and re-rolls only its
    /// ancestor chain.
    ///
    /// # Errors
    /// See [`sync_progress_from_work_order`].
    pub fn sync_work_order(
        &self,
        tasks: &mut [Task],
        task_id: &str,
        record: &WorkOrderRecord,
    ) -> Result<Vec<TaskIntent>, EngineError> {
        sync_progress_from_work_order(tasks, task_id, record, self.config.progress_weighting)
    }

    fn run(
        &self,
        input: &[Task],
        edit: Option<&TaskEdit>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Vec<Task>, Vec<TaskIntent>, CriticalPathReport), EngineError> {
        let mut tasks = match edit {
            Some(edit) => apply_edit(input, edit).map_err(|e| {
                if let EngineError::HierarchyCycle(cycle) = &e {
                    diagnostics.cycles.push(hierarchy_report(cycle));
                }
                e
            })?,
            None => input.to_vec(),
        };
        validate_input(&tasks).map_err(EngineError::InvalidInput)?;
        for task in tasks.iter_mut() {
            task.clear_derived();
        }

        let tree = TaskTree::build(&tasks).map_err(|e| {
            diagnostics.cycles.push(hierarchy_report(&e));
            EngineError::from(e)
        })?;
        diagnostics.orphan_references = tree.orphans().to_vec();
        apply_wbs(&mut tasks, &tree);

        self.parse_pending(&mut tasks, diagnostics);

        let calendar = self.config.calendar();
        let outcome = AutoScheduler::new()
            .with_calendar(calendar)
            .schedule(&tasks, &tree)
            .map_err(|e| {
                diagnostics.cycles.push(CycleReport {
                    kind: CycleKind::Dependency,
                    task_ids: e.task_ids.clone(),
                });
                EngineError::from(e)
            })?;
        let mut tasks = outcome.tasks;
        diagnostics.merge(outcome.diagnostics);

        let report =
            calculate_critical_path(&tasks, &tree, &calendar, self.config.critical_slack_days);
        report.apply(&mut tasks);
        diagnostics.excluded_from_critical_path = report.excluded.clone();

        calculate_summary_dates(&mut tasks, &tree, self.config.progress_weighting);

        let before: HashMap<&str, f64> =
            input.iter().map(|t| (t.id.as_str(), t.progress)).collect();
        let intents: Vec<TaskIntent> = tasks
            .iter()
            .flat_map(|t| progress_intents(t, before.get(t.id.as_str()).copied().unwrap_or(0.0)))
            .collect();

        debug!(
            tasks = tasks.len(),
            critical = report.critical_path.len(),
            intents = intents.len(),
            clean = diagnostics.is_clean(),
            "recompute complete"
        );
        Ok((tasks, intents, report))
    }

    /// Parses every pending predecessor expression. Failures leave the task
    /// without links for this pass and keep the text for correction.
    fn parse_pending(&self, tasks: &mut [Task], diagnostics: &mut Diagnostics) {
        for task in tasks.iter_mut() {
            let Some(text) = task.predecessor_text.take() else {
                continue;
            };
            match parse_predecessors(&text) {
                Ok(deps) => task.predecessors = deps,
                Err(e) => {
                    warn!(task = %task.id, %text, error = %e, "predecessor expression rejected");
                    diagnostics.parse_failures.push(ParseFailure {
                        task_id: task.id.clone(),
                        text: text.clone(),
                        message: e.to_string(),
                    });
                    task.predecessors.clear();
                    task.predecessor_text = Some(text);
                }
            }
        }
    }
}

fn hierarchy_report(cycle: &HierarchyCycleError) -> CycleReport {
    let mut task_ids = cycle.chain.clone();
    task_ids.sort();
    task_ids.dedup();
    CycleReport {
        kind: CycleKind::Hierarchy,
        task_ids,
    }
}
