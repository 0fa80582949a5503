//! Summary rollup.
//!
//! Summary tasks derive their span and progress from their children:
//! `start = min(children.start)`, `end = max(children.end)` and progress is
//! the weighted mean of children's progress. Under
//! [`ProgressWeighting::Duration`] milestones weigh nothing; if every child
//! weighs nothing the plain mean is used.
//!
//! [`calculate_summary_dates`] walks the whole forest in post-order.
//! [`sync_progress_from_work_order`] is the incremental path: it updates one
//! leaf from its linked work order and re-rolls only that leaf's ancestors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::models::{Task, TaskIntent, WorkCalendar, WorkOrderRecord};
use crate::tree::TaskTree;

const PROGRESS_EPSILON: f64 = 1e-9;

/// How children's progress is weighted in a summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressWeighting {
    /// Weight by working-day duration.
    #[default]
    Duration,
    /// Every child counts the same.
    Equal,
}

impl ProgressWeighting {
    fn weight(self, task: &Task) -> f64 {
        match self {
            Self::Duration => task.effective_duration() as f64,
            Self::Equal => 1.0,
        }
    }
}

/// Weighted mean progress of `tasks`; `0.0` for an empty set.
pub fn weighted_progress<'a, I>(tasks: I, weighting: ProgressWeighting) -> f64
where
    I: IntoIterator<Item = &'a Task>,
{
    let items: Vec<(f64, f64)> = tasks
        .into_iter()
        .map(|t| (t.progress, weighting.weight(t)))
        .collect();
    if items.is_empty() {
        return 0.0;
    }

    let total: f64 = items.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        items.iter().map(|(p, w)| p * w).sum::<f64>() / total
    } else {
        items.iter().map(|(p, _)| p).sum::<f64>() / items.len() as f64
    }
}

/// Sets a summary's dates to the span of its children.
pub(crate) fn roll_up_span(tasks: &mut [Task], node: usize, children: &[usize]) {
    let start = children.iter().map(|&c| tasks[c].start_date).min();
    let end = children.iter().map(|&c| tasks[c].end_date).max();
    if let (Some(start), Some(end)) = (start, end) {
        let summary = &mut tasks[node];
        summary.start_date = start;
        summary.end_date = end;
        summary.duration = WorkCalendar::calc_duration(start, end);
        summary.milestone = false;
    }
}

fn roll_up(tasks: &mut [Task], node: usize, children: &[usize], weighting: ProgressWeighting) {
    roll_up_span(tasks, node, children);
    let progress = weighted_progress(children.iter().map(|&c| &tasks[c]), weighting);
    tasks[node].set_progress(progress);
}

/// Rolls dates and progress up into every summary task, bottom-up.
pub fn calculate_summary_dates(tasks: &mut [Task], tree: &TaskTree, weighting: ProgressWeighting) {
    let index: HashMap<String, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.clone(), i))
        .collect();

    let mut summaries = 0usize;
    for id in tree.post_order() {
        if !tree.is_summary(&id) {
            continue;
        }
        let Some(&node) = index.get(&id) else {
            continue;
        };
        let children: Vec<usize> = tree
            .children_of(&id)
            .iter()
            .filter_map(|c| index.get(c).copied())
            .collect();
        roll_up(tasks, node, &children, weighting);
        summaries += 1;
    }
    debug!(summaries, "summary rollup complete");
}

/// Intents implied by a progress change from `before` to the task's current value.
pub(crate) fn progress_intents(task: &Task, before: f64) -> Vec<TaskIntent> {
    if (task.progress - before).abs() <= PROGRESS_EPSILON {
        return Vec::new();
    }
    let mut intents = vec![TaskIntent::ProgressChanged {
        task_id: task.id.clone(),
        linked_record_id: task.linked_record_id.clone(),
        progress: task.progress,
    }];
    if task.progress >= 100.0 && before < 100.0 {
        intents.push(TaskIntent::Completed {
            task_id: task.id.clone(),
            linked_record_id: task.linked_record_id.clone(),
        });
    }
    intents
}

/// Applies a linked work order's state to a leaf task and re-rolls its
/// ancestor chain.
///
/// Only the task and its ancestors are touched; parents are resolved the
/// way [`TaskTree::build`] resolves them. Returns the intents for
/// every task whose progress changed, leaf first.
///
/// # Errors
/// - [`EngineError::TaskNotFound`] if `task_id` is unknown
/// - [`EngineError::UnlinkedWorkOrder`] if the record is not the task's linked record
/// - [`EngineError::SummaryNotEditable`] if the task has children
/// - [`EngineError::HierarchyCycle`] if the `parent_id` chain loops
pub fn sync_progress_from_work_order(
    tasks: &mut [Task],
    task_id: &str,
    record: &WorkOrderRecord,
    weighting: ProgressWeighting,
) -> Result<Vec<TaskIntent>, EngineError> {
    let index: HashMap<String, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.clone(), i))
        .collect();
    let &leaf = index
        .get(task_id)
        .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
    if tasks[leaf].linked_record_id.as_deref() != Some(record.id.as_str()) {
        return Err(EngineError::UnlinkedWorkOrder {
            task_id: task_id.to_string(),
            record_id: record.id.clone(),
        });
    }
    let tree = TaskTree::build(tasks)?;
    if tree.is_summary(task_id) {
        return Err(EngineError::SummaryNotEditable(task_id.to_string()));
    }

    let before = tasks[leaf].progress;
    let Some(progress) = record.implied_progress(before) else {
        debug!(task = %task_id, record = %record.id, "work order carries no progress, kept");
        return Ok(Vec::new());
    };
    tasks[leaf].set_progress(progress);
    let mut intents = progress_intents(&tasks[leaf], before);
    if intents.is_empty() {
        return Ok(intents);
    }

    let mut current = task_id.to_string();
    while let Some(parent_id) = tree.parent_of(&current).map(str::to_string) {
        let Some(&parent) = index.get(&parent_id) else {
            break;
        };
        let kids: Vec<usize> = tree
            .children_of(&parent_id)
            .iter()
            .filter_map(|c| index.get(c).copied())
            .collect();
        let before = tasks[parent].progress;
        roll_up(tasks, parent, &kids, weighting);
        trace!(task = %parent_id, progress = tasks[parent].progress, "ancestor re-rolled");
        intents.extend(progress_intents(&tasks[parent], before));
        current = parent_id;
    }

    debug!(task = %task_id, progress, intents = intents.len(), "progress synced from work order");
    Ok(intents)
}
