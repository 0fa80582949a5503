//! User edits.
//!
//! A [`TaskEdit`] is one mutation coming from the Gantt view: create,
//! patch, delete, reparent, reorder, indent or outdent. [`apply_edit`]
//! applies it to a copy of the task set and returns the edited copy; the
//! recompute pipeline then derives everything else.
//!
//! Summary tasks have derived dates and progress, so patches touching
//! those fields on a summary are rejected.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, HierarchyCycleError, Result};
use crate::models::{Task, WorkCalendar};
use crate::predecessor::{format_predecessors, parse_predecessors};

/// Partial update of a task. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub assignee: Option<String>,
    /// Alone: moves the task, keeping its duration.
    pub start_date: Option<NaiveDate>,
    /// Alone: resizes the task, keeping its start.
    pub end_date: Option<NaiveDate>,
    pub duration: Option<i64>,
    pub progress: Option<f64>,
    /// Raw predecessor expression, parsed on recompute.
    pub predecessors: Option<String>,
    pub milestone: Option<bool>,
    pub manual_pin: Option<bool>,
    pub linked_record_id: Option<String>,
}

impl TaskPatch {
    /// Whether the patch writes a field that summaries derive.
    pub fn touches_derived(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.duration.is_some()
            || self.progress.is_some()
            || self.milestone.is_some()
    }
}

/// A single edit event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum TaskEdit {
    Create {
        task: Task,
    },
    Patch {
        id: String,
        patch: TaskPatch,
    },
    /// Removes the task with its subtree.
    Delete {
        id: String,
    },
    /// Moves the task under another parent (`None` = root).
    Reparent {
        id: String,
        parent_id: Option<String>,
        order: Option<f64>,
    },
    Reorder {
        id: String,
        order: f64,
    },
    /// Makes the task the last child of its previous sibling.
    Indent {
        id: String,
    },
    /// Makes the task the sibling right after its former parent.
    Outdent {
        id: String,
    },
}

/// Applies `edit` to a copy of `tasks`.
///
/// # Errors
/// - [`EngineError::TaskNotFound`] for unknown task or parent ids
/// - [`EngineError::DuplicateTask`] when creating an existing id
/// - [`EngineError::SummaryNotEditable`] for derived fields of a summary
/// - [`EngineError::HierarchyCycle`] when reparenting under a descendant
/// - [`EngineError::InvalidEdit`] for values the task cannot take
pub fn apply_edit(tasks: &[Task], edit: &TaskEdit) -> Result<Vec<Task>> {
    let mut out = tasks.to_vec();
    match edit {
        TaskEdit::Create { task } => create(&mut out, task)?,
        TaskEdit::Patch { id, patch } => {
            let i = position(&out, id)?;
            if patch.touches_derived() && has_children(&out, id) {
                return Err(EngineError::SummaryNotEditable(id.clone()));
            }
            apply_patch(&mut out[i], patch)?;
        }
        TaskEdit::Delete { id } => return delete(out, id),
        TaskEdit::Reparent {
            id,
            parent_id,
            order,
        } => reparent(&mut out, id, parent_id.as_deref(), *order)?,
        TaskEdit::Reorder { id, order } => {
            let i = position(&out, id)?;
            check_order(*order)?;
            out[i].order = *order;
        }
        TaskEdit::Indent { id } => indent(&mut out, id)?,
        TaskEdit::Outdent { id } => outdent(&mut out, id)?,
    }
    Ok(out)
}

fn position(tasks: &[Task], id: &str) -> Result<usize> {
    tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))
}

fn has_children(tasks: &[Task], id: &str) -> bool {
    tasks.iter().any(|t| t.parent_id.as_deref() == Some(id))
}

fn check_order(order: f64) -> Result<()> {
    if order.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidEdit(format!("order key {order} is not finite")))
    }
}

/// Children of `parent` (roots for `None`), in sibling order.
fn siblings(tasks: &[Task], parent: Option<&str>) -> Vec<usize> {
    let mut ids: Vec<usize> = (0..tasks.len())
        .filter(|&i| tasks[i].parent_id.as_deref() == parent)
        .collect();
    ids.sort_by(|&a, &b| tasks[a].order.total_cmp(&tasks[b].order).then(a.cmp(&b)));
    ids
}

/// Order key placing a task after the last child of `parent`.
fn next_order(tasks: &[Task], parent: Option<&str>, skip: usize) -> f64 {
    siblings(tasks, parent)
        .into_iter()
        .filter(|&i| i != skip)
        .map(|i| tasks[i].order)
        .last()
        .map_or(1.0, |o| o + 1.0)
}

fn create(tasks: &mut Vec<Task>, task: &Task) -> Result<()> {
    if tasks.iter().any(|t| t.id == task.id) {
        return Err(EngineError::DuplicateTask(task.id.clone()));
    }
    if let Some(first) = tasks.first() {
        if task.project_id != first.project_id {
            return Err(EngineError::InvalidEdit(format!(
                "task {} belongs to project '{}', not '{}'",
                task.id, task.project_id, first.project_id
            )));
        }
    }
    if task.duration < 0 {
        return Err(EngineError::InvalidEdit(format!(
            "task {} has negative duration",
            task.id
        )));
    }

    let mut created = task.clone();
    created.clear_derived();
    created.sync_end_date();
    debug!(task = %created.id, "task created");
    tasks.push(created);
    Ok(())
}

fn apply_patch(task: &mut Task, patch: &TaskPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        task.name = name.clone();
    }
    if let Some(assignee) = &patch.assignee {
        task.assignee = Some(assignee.clone());
    }

    match (patch.start_date, patch.end_date) {
        (Some(start), None) => task.move_to(start),
        (start, Some(end)) => {
            let start = start.unwrap_or(task.start_date);
            if end < start {
                return Err(EngineError::InvalidEdit(format!(
                    "task {} would end {end} before it starts {start}",
                    task.id
                )));
            }
            task.start_date = start;
            task.duration = WorkCalendar::calc_duration(start, end);
            task.milestone = false;
            task.sync_end_date();
        }
        (None, None) => {}
    }

    if let Some(duration) = patch.duration {
        if duration < 0 {
            return Err(EngineError::InvalidEdit(format!(
                "task {} cannot take duration {duration}",
                task.id
            )));
        }
        task.duration = duration;
        task.milestone = task.milestone && duration == 0;
        task.sync_end_date();
    }

    match patch.milestone {
        Some(true) => {
            task.milestone = true;
            task.duration = 0;
            task.sync_end_date();
        }
        Some(false) if task.milestone => {
            task.milestone = false;
            task.duration = task.duration.max(1);
            task.sync_end_date();
        }
        _ => {}
    }

    if let Some(progress) = patch.progress {
        if !progress.is_finite() || !(0.0..=100.0).contains(&progress) {
            return Err(EngineError::InvalidEdit(format!(
                "task {} cannot take progress {progress}",
                task.id
            )));
        }
        task.set_progress(progress);
    }
    if let Some(text) = &patch.predecessors {
        task.predecessor_text = Some(text.clone());
    }
    if let Some(pin) = patch.manual_pin {
        task.manual_pin = pin;
    }
    if let Some(record) = &patch.linked_record_id {
        task.linked_record_id = Some(record.clone());
    }
    Ok(())
}

fn delete(tasks: Vec<Task>, id: &str) -> Result<Vec<Task>> {
    position(&tasks, id)?;

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for t in &tasks {
        if let Some(p) = t.parent_id.as_deref() {
            children.entry(p).or_default().push(t.id.as_str());
        }
    }
    let mut removed: HashSet<String> = HashSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if removed.insert(current.to_string()) {
            stack.extend(children.get(current).into_iter().flatten().copied());
        }
    }

    let mut kept: Vec<Task> = tasks
        .iter()
        .filter(|t| !removed.contains(&t.id))
        .cloned()
        .collect();
    let mut pruned = 0usize;
    for task in kept.iter_mut() {
        let before = task.predecessors.len();
        task.predecessors.retain(|d| !removed.contains(&d.predecessor_id));
        pruned += before - task.predecessors.len();

        // pending text: rewrite it if it still parses
        let parsed = task.predecessor_text.as_deref().map(parse_predecessors);
        if let Some(Ok(deps)) = parsed {
            let remaining: Vec<_> = deps
                .into_iter()
                .filter(|d| !removed.contains(&d.predecessor_id))
                .collect();
            task.predecessor_text = Some(format_predecessors(&remaining));
        }
    }

    debug!(task = %id, removed = removed.len(), pruned, "subtree deleted");
    Ok(kept)
}

fn reparent(tasks: &mut [Task], id: &str, parent: Option<&str>, order: Option<f64>) -> Result<()> {
    let i = position(tasks, id)?;
    if let Some(pid) = parent {
        position(tasks, pid)?;
        // the new parent must not sit inside the moved subtree
        let parents: HashMap<&str, &str> = tasks
            .iter()
            .filter_map(|t| t.parent_id.as_deref().map(|p| (t.id.as_str(), p)))
            .collect();
        let mut path = vec![pid.to_string()];
        let mut current = pid;
        let mut guard = HashSet::new();
        while current != id {
            match parents.get(current) {
                Some(&p) if guard.insert(p) => {
                    path.push(p.to_string());
                    current = p;
                }
                _ => break,
            }
        }
        if current == id {
            path.reverse();
            path.push(id.to_string());
            return Err(HierarchyCycleError {
                task_id: id.to_string(),
                chain: path,
            }
            .into());
        }
    }

    let order = match order {
        Some(o) => {
            check_order(o)?;
            o
        }
        None => next_order(tasks, parent, i),
    };
    tasks[i].parent_id = parent.map(str::to_string);
    tasks[i].order = order;
    debug!(task = %id, parent = ?parent, order, "task reparented");
    Ok(())
}

fn indent(tasks: &mut [Task], id: &str) -> Result<()> {
    let i = position(tasks, id)?;
    let group = siblings(tasks, tasks[i].parent_id.as_deref());
    let at = group.iter().position(|&s| s == i).unwrap_or_default();
    let Some(&prev) = at.checked_sub(1).and_then(|p| group.get(p)) else {
        return Err(EngineError::InvalidEdit(format!(
            "task {id} has no previous sibling to indent under"
        )));
    };
    let new_parent = tasks[prev].id.clone();
    reparent(tasks, id, Some(&new_parent), None)
}

fn outdent(tasks: &mut [Task], id: &str) -> Result<()> {
    let i = position(tasks, id)?;
    let Some(parent_id) = tasks[i].parent_id.clone() else {
        return Err(EngineError::InvalidEdit(format!("task {id} is already a root")));
    };
    let p = position(tasks, &parent_id)?;
    let grandparent = tasks[p].parent_id.clone();

    let group = siblings(tasks, grandparent.as_deref());
    let at = group.iter().position(|&s| s == p).unwrap_or_default();
    let order = match group.get(at + 1) {
        Some(&next) => (tasks[p].order + tasks[next].order) / 2.0,
        None => tasks[p].order + 1.0,
    };
    reparent(tasks, id, grandparent.as_deref(), Some(order))
}
