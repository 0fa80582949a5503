//! Dependency-driven auto-scheduler.
//!
//! # Algorithm
//!
//! 1. Build the dependency graph (predecessor links plus child→parent rollup
//!    edges) and order it with Kahn's algorithm. Residual nodes mean a
//!    cycle: fail without touching any date.
//! 2. Walk the order. A summary takes the span of its children. A leaf with
//!    valid predecessors starts at the latest start its links allow
//!    (as soon as possible); a leaf without keeps its start.
//! 3. Pinned leaves never move. If their links require a later start, a
//!    [`ConstraintViolation`] is reported instead.
//!
//! Running the scheduler on its own output changes nothing.
//!
//! # Complexity
//! O(n + e) where n = tasks, e = expanded dependency edges.

use tracing::{debug, warn};

use super::graph::{required_start, DependencyGraph, Span};
use crate::error::SchedulingCycleError;
use crate::models::{ConstraintViolation, Diagnostics, LagUnit, Task, WorkCalendar};
use crate::rollup::roll_up_span;
use crate::tree::TaskTree;

/// Result of an auto-scheduling pass.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Tasks with updated dates, in input order.
    pub tasks: Vec<Task>,
    /// Constraint violations and dangling predecessors.
    pub diagnostics: Diagnostics,
}

/// Topological auto-scheduler.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_wbs::models::{Dependency, Task};
/// use u_wbs::scheduler::AutoScheduler;
/// use u_wbs::tree::TaskTree;
///
/// let mon = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let tasks = vec![
///     Task::new("A", mon).with_duration(3),
///     Task::new("B", mon).with_duration(2).with_predecessor(Dependency::new("A")),
/// ];
/// let tree = TaskTree::build(&tasks).unwrap();
/// let outcome = AutoScheduler::new().schedule(&tasks, &tree).unwrap();
/// assert_eq!(outcome.tasks[1].start_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AutoScheduler {
    calendar: WorkCalendar,
}

impl AutoScheduler {
    /// Creates a scheduler with working-day lags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the calendar.
    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Sets the lag unit.
    pub fn with_lag_unit(mut self, lag_unit: LagUnit) -> Self {
        self.calendar = self.calendar.with_lag_unit(lag_unit);
        self
    }

    /// Schedules every task against its predecessors.
    ///
    /// # Errors
    /// [`SchedulingCycleError`] if the dependency graph has a cycle; the
    /// input is left untouched.
    pub fn schedule(
        &self,
        tasks: &[Task],
        tree: &TaskTree,
    ) -> Result<ScheduleOutcome, SchedulingCycleError> {
        let graph = DependencyGraph::build(tasks, tree);
        let (order, stuck) = graph.kahn();
        if !stuck.is_empty() {
            let mut task_ids: Vec<String> = graph
                .cycle_core(&stuck)
                .into_iter()
                .map(|i| tasks[i].id.clone())
                .collect();
            task_ids.sort();
            warn!(tasks = ?task_ids, "dependency cycle, schedule left unchanged");
            return Err(SchedulingCycleError { task_ids });
        }

        let mut out: Vec<Task> = tasks.to_vec();
        for task in out.iter_mut() {
            task.is_summary = tree.is_summary(&task.id);
        }
        let index: std::collections::HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        let mut diagnostics = Diagnostics::new();
        diagnostics.dangling_predecessors = graph.dangling.clone();
        for d in &graph.dangling {
            warn!(task = %d.task_id, predecessor = %d.predecessor_id, "dangling predecessor ignored");
        }

        let mut moved = 0usize;
        for node in order {
            if out[node].is_summary {
                let children: Vec<usize> = tree
                    .children_of(&tasks[node].id)
                    .iter()
                    .filter_map(|c| index.get(c.as_str()).copied())
                    .collect();
                roll_up_span(&mut out, node, &children);
                continue;
            }

            let duration = out[node].effective_duration();
            let required = graph
                .dependency_edges_into(node)
                .map(|edge| {
                    let pred = Span::of(&out[edge.from]);
                    let lag = self
                        .calendar
                        .lag_in_working_days(pred.anchor(edge.dep_type), edge.lag_days);
                    required_start(pred, edge.dep_type, lag, duration)
                })
                .max();

            let task = &mut out[node];
            let current = WorkCalendar::ordinal(task.start_date);
            match required {
                Some(req) if task.manual_pin => {
                    if req > current {
                        let required_start = WorkCalendar::from_ordinal(req);
                        debug!(task = %task.id, %required_start, "pinned task violates its predecessors");
                        diagnostics.constraint_violations.push(ConstraintViolation {
                            task_id: task.id.clone(),
                            pinned_start: task.start_date,
                            required_start,
                        });
                    }
                    task.sync_end_date();
                }
                Some(req) => {
                    let start = WorkCalendar::from_ordinal(req);
                    if start != task.start_date {
                        moved += 1;
                    }
                    task.move_to(start);
                }
                None if task.manual_pin => task.sync_end_date(),
                None => task.move_to(WorkCalendar::next_working_day(task.start_date)),
            }
        }

        debug!(tasks = out.len(), moved, "auto-schedule pass complete");
        Ok(ScheduleOutcome {
            tasks: out,
            diagnostics,
        })
    }
}

/// Schedules `tasks` with the given calendar.
///
/// Convenience wrapper over [`AutoScheduler::schedule`].
pub fn auto_schedule_tasks(
    tasks: &[Task],
    tree: &TaskTree,
    calendar: WorkCalendar,
) -> Result<ScheduleOutcome, SchedulingCycleError> {
    AutoScheduler::new().with_calendar(calendar).schedule(tasks, tree)
}
