//! WBS position codes.
//!
//! Roots are numbered `1`, `2`, … and the k-th child of a task gets
//! `<parent>.<k>` (1-indexed), in depth-first, order-respecting traversal.
//! Numbering depends only on tree shape and sibling order, so rerunning it
//! on an unchanged tree is idempotent.

use std::collections::HashMap;

use super::TaskTree;
use crate::models::Task;

/// Computes the WBS code of every task in the tree.
pub fn recalculate_wbs(tree: &TaskTree) -> HashMap<String, String> {
    let mut codes = HashMap::new();
    let mut stack: Vec<(String, String)> = tree
        .roots()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, id)| (id.clone(), (i + 1).to_string()))
        .collect();

    while let Some((id, code)) = stack.pop() {
        for (k, child) in tree.children_of(&id).iter().enumerate().rev() {
            stack.push((child.clone(), format!("{code}.{}", k + 1)));
        }
        codes.insert(id, code);
    }
    codes
}

/// Writes WBS codes and summary flags onto the tasks.
pub fn apply_wbs(tasks: &mut [Task], tree: &TaskTree) {
    let codes = recalculate_wbs(tree);
    for task in tasks.iter_mut() {
        task.wbs_code = codes.get(&task.id).cloned().unwrap_or_default();
        task.is_summary = tree.is_summary(&task.id);
    }
}

/// Compares two WBS codes segment by segment (`1.2` < `1.10` < `2`).
pub fn compare_wbs(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |s: &str| -> Vec<u64> { s.split('.').filter_map(|p| p.parse().ok()).collect() };
    parse(a).cmp(&parse(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: &str, parent: Option<&str>, order: f64) -> Task {
        let t = Task::new(id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).with_order(order);
        match parent {
            Some(p) => t.with_parent(p),
            None => t,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("design", None, 1.0),
            task("build", None, 2.0),
            task("walls", Some("build"), 2.0),
            task("found", Some("build"), 1.0),
            task("pour", Some("found"), 1.0),
            task("cure", Some("found"), 2.0),
            task("roof", Some("build"), 3.0),
        ]
    }

    #[test]
    fn test_codes() {
        let tree = TaskTree::build(&sample()).unwrap();
        let codes = recalculate_wbs(&tree);
        assert_eq!(codes["design"], "1");
        assert_eq!(codes["build"], "2");
        assert_eq!(codes["found"], "2.1");
        assert_eq!(codes["pour"], "2.1.1");
        assert_eq!(codes["cure"], "2.1.2");
        assert_eq!(codes["walls"], "2.2");
        assert_eq!(codes["roof"], "2.3");
    }

    #[test]
    fn test_idempotent() {
        let tree = TaskTree::build(&sample()).unwrap();
        assert_eq!(recalculate_wbs(&tree), recalculate_wbs(&tree));
    }

    #[test]
    fn test_codes_unique_and_increasing_in_traversal() {
        let tree = TaskTree::build(&sample()).unwrap();
        let codes = recalculate_wbs(&tree);
        let in_order: Vec<&String> = tree.pre_order().iter().map(|(id, _)| &codes[id]).collect();
        for pair in in_order.windows(2) {
            assert_eq!(compare_wbs(pair[0], pair[1]), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn test_reorder_swaps_only_moved_siblings() {
        let before = recalculate_wbs(&TaskTree::build(&sample()).unwrap());

        let mut tasks = sample();
        // move "walls" ahead of "found"
        tasks
            .iter_mut()
            .find(|t| t.id == "walls")
            .unwrap()
            .order = 0.5;
        let after = recalculate_wbs(&TaskTree::build(&tasks).unwrap());

        assert_eq!(after["walls"], "2.1");
        assert_eq!(after["found"], "2.2");
        assert_eq!(after["pour"], "2.2.1");
        assert_eq!(after["roof"], before["roof"]);
        assert_eq!(after["design"], before["design"]);
    }

    #[test]
    fn test_apply_wbs_sets_summary_flags() {
        let mut tasks = sample();
        let tree = TaskTree::build(&tasks).unwrap();
        apply_wbs(&mut tasks, &tree);

        let build = tasks.iter().find(|t| t.id == "build").unwrap();
        assert!(build.is_summary);
        assert_eq!(build.wbs_code, "2");
        let pour = tasks.iter().find(|t| t.id == "pour").unwrap();
        assert!(!pour.is_summary);
    }

    #[test]
    fn test_compare_wbs_numeric_segments() {
        use std::cmp::Ordering;
        assert_eq!(compare_wbs("1.2", "1.10"), Ordering::Less);
        assert_eq!(compare_wbs("1.10", "2"), Ordering::Less);
        assert_eq!(compare_wbs("2", "2.1"), Ordering::Less);
    }
}
