//! Task hierarchy builder.
//!
//! Assembles a flat task list into a forest keyed by task id. Children are
//! grouped by `parent_id` in a single pass and sorted by `order` (ties keep
//! input order). The builder never mutates its input.
//!
//! # Recovery
//! A `parent_id` that references a missing task, or a task of another
//! project, demotes the task to a root and is reported as an
//! [`OrphanReference`]. A cycle in the `parent_id` chain is fatal.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::HierarchyCycleError;
use crate::models::{OrphanReference, Task};

/// Parent/child view over a project's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, String>,
    orphans: Vec<OrphanReference>,
}

impl TaskTree {
    /// Builds the forest for `tasks`.
    ///
    /// # Errors
    /// [`HierarchyCycleError`] if any task's ancestor chain revisits a task.
    pub fn build(tasks: &[Task]) -> Result<Self, HierarchyCycleError> {
        let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut tree = TaskTree::default();
        let mut siblings: HashMap<Option<&str>, Vec<(usize, &Task)>> = HashMap::new();

        for (pos, task) in tasks.iter().enumerate() {
            let parent = match task.parent_id.as_deref() {
                None => None,
                Some(pid) => match by_id.get(pid) {
                    Some(p) if p.project_id == task.project_id => Some(pid),
                    _ => {
                        warn!(task = %task.id, parent = %pid, "orphan parent reference, promoting to root");
                        tree.orphans.push(OrphanReference {
                            task_id: task.id.clone(),
                            parent_id: pid.to_string(),
                        });
                        None
                    }
                },
            };
            if let Some(pid) = parent {
                tree.parents.insert(task.id.clone(), pid.to_string());
            }
            siblings.entry(parent).or_default().push((pos, task));
        }

        tree.check_acyclic(tasks)?;

        for (parent, mut group) in siblings {
            group.sort_by(|(pa, a), (pb, b)| a.order.total_cmp(&b.order).then(pa.cmp(pb)));
            let ids: Vec<String> = group.into_iter().map(|(_, t)| t.id.clone()).collect();
            match parent {
                None => tree.roots = ids,
                Some(pid) => {
                    tree.children.insert(pid.to_string(), ids);
                }
            }
        }

        Ok(tree)
    }

    /// Walks every ancestor chain once; chains already proven to reach a
    /// root are not walked again.
    fn check_acyclic(&self, tasks: &[Task]) -> Result<(), HierarchyCycleError> {
        let mut rooted: HashSet<&str> = HashSet::new();

        for task in tasks {
            let mut chain: Vec<&str> = Vec::new();
            let mut on_chain: HashSet<&str> = HashSet::new();
            let mut current = Some(task.id.as_str());

            while let Some(id) = current {
                if rooted.contains(id) {
                    break;
                }
                if !on_chain.insert(id) {
                    let mut ids: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
                    ids.push(id.to_string());
                    return Err(HierarchyCycleError {
                        task_id: id.to_string(),
                        chain: ids,
                    });
                }
                chain.push(id);
                current = self.parents.get(id).map(String::as_str);
            }

            rooted.extend(chain);
        }
        Ok(())
    }

    /// Root task ids in sibling order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Ordered children of a task (empty for leaves and unknown ids).
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Effective parent (after orphan demotion).
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// Whether the task has at least one child.
    pub fn is_summary(&self, id: &str) -> bool {
        !self.children_of(id).is_empty()
    }

    /// Parent references that had to be dropped.
    pub fn orphans(&self) -> &[OrphanReference] {
        &self.orphans
    }

    /// Ancestors of a task, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(pid) = current {
            out.push(pid.to_string());
            current = self.parent_of(pid);
        }
        out
    }

    /// Whether `ancestor` is a proper ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.parent_of(id);
        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            current = self.parent_of(pid);
        }
        false
    }

    /// All descendants of a task in depth-first order (excluding the task).
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.children_of(id).iter().rev().map(String::as_str).collect();
        while let Some(next) = stack.pop() {
            out.push(next.to_string());
            stack.extend(self.children_of(next).iter().rev().map(String::as_str));
        }
        out
    }

    /// Leaf descendants of a task; a leaf is its own only leaf.
    pub fn leaf_descendants(&self, id: &str) -> Vec<String> {
        if !self.is_summary(id) {
            return vec![id.to_string()];
        }
        self.descendants(id)
            .into_iter()
            .filter(|d| !self.is_summary(d))
            .collect()
    }

    /// Depth-first, order-respecting traversal: `(id, depth)` with roots at depth 0.
    pub fn pre_order(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        let mut stack: Vec<(&str, usize)> =
            self.roots.iter().rev().map(|r| (r.as_str(), 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            out.push((id.to_string(), depth));
            stack.extend(
                self.children_of(id)
                    .iter()
                    .rev()
                    .map(|c| (c.as_str(), depth + 1)),
            );
        }
        out
    }

    /// Children-before-parents traversal.
    pub fn post_order(&self) -> Vec<String> {
        let mut out: Vec<String> = self.pre_order().into_iter().map(|(id, _)| id).collect();
        // Reversed pre-order with reversed sibling order is a valid post-order
        // for rollups: every node appears after all of its descendants.
        out.reverse();
        out
    }
}
