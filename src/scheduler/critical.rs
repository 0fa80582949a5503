//! Critical Path Method.
//!
//! Two passes over the dependency graph in working-day ordinals:
//!
//! - **Forward** (topological order): `ES = max(scheduled start, link
//!   constraints)`, `EF = ES + duration - 1`. Summaries span their children.
//! - **Backward** (reverse order, seeded with the project finish): each
//!   outgoing link bounds the predecessor's latest finish (finish-anchored
//!   links) or latest start (start-anchored links). Children inherit the
//!   finish bound of their summary; its start bound applies only to the
//!   children that open the summary. `LS = LF - duration + 1`.
//!
//! `slack = LS - ES`; a task is critical when its slack is at or below the
//! configured threshold (0 by default).
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::{DependencyGraph, EdgeKind, Span};
use crate::models::{
    DependencyType, ExcludedTask, ExclusionReason, Task, WorkCalendar,
};
use crate::tree::TaskTree;

/// CPM dates of one task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CpmTimes {
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    /// Total slack in working days.
    pub slack_days: i64,
    pub is_critical: bool,
}

/// Critical path analysis result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriticalPathReport {
    /// CPM dates of every analyzed task (leaves and summaries).
    pub times: HashMap<String, CpmTimes>,
    /// Critical leaf tasks in topological order.
    pub critical_path: Vec<String>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    /// Tasks left out of the analysis.
    pub excluded: Vec<ExcludedTask>,
}

impl CriticalPathReport {
    /// Whether the task is on the critical path.
    pub fn is_critical(&self, id: &str) -> bool {
        self.times.get(id).is_some_and(|t| t.is_critical)
    }

    /// Slack of an analyzed task.
    pub fn slack(&self, id: &str) -> Option<i64> {
        self.times.get(id).map(|t| t.slack_days)
    }

    /// Writes CPM fields onto the tasks; excluded tasks are cleared.
    pub fn apply(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            match self.times.get(&task.id) {
                Some(t) => {
                    task.early_start = Some(t.early_start);
                    task.early_finish = Some(t.early_finish);
                    task.late_start = Some(t.late_start);
                    task.late_finish = Some(t.late_finish);
                    task.total_slack_days = Some(t.slack_days);
                    task.is_critical = t.is_critical;
                }
                None => {
                    task.early_start = None;
                    task.early_finish = None;
                    task.late_start = None;
                    task.late_finish = None;
                    task.total_slack_days = None;
                    task.is_critical = false;
                }
            }
        }
    }
}

/// Ordinal CPM record.
#[derive(Debug, Clone, Copy, Default)]
struct Times {
    es: i64,
    ef: i64,
    ls: i64,
    lf: i64,
}

/// Runs CPM over the scheduled task set.
///
/// Leaves untouched by any dependency link (directly or through an
/// ancestor) are excluded as [`ExclusionReason::Unlinked`]; nodes on or
/// behind a cycle as [`ExclusionReason::Cyclic`].
pub fn calculate_critical_path(
    tasks: &[Task],
    tree: &TaskTree,
    calendar: &WorkCalendar,
    critical_slack_days: i64,
) -> CriticalPathReport {
    let graph = DependencyGraph::build(tasks, tree);
    let (order, stuck) = graph.kahn();
    let n = tasks.len();
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();
    let summary: Vec<bool> = tasks.iter().map(|t| tree.is_summary(&t.id)).collect();
    let children: Vec<Vec<usize>> = tasks
        .iter()
        .map(|t| {
            tree.children_of(&t.id)
                .iter()
                .filter_map(|c| index.get(c.as_str()).copied())
                .collect()
        })
        .collect();
    let parent: Vec<Option<usize>> = tasks
        .iter()
        .map(|t| tree.parent_of(&t.id).and_then(|p| index.get(p).copied()))
        .collect();

    let mut report = CriticalPathReport::default();
    let mut analyzed = vec![false; n];
    for &i in &order {
        analyzed[i] = true;
    }
    for &i in &stuck {
        report.excluded.push(ExcludedTask {
            task_id: tasks[i].id.clone(),
            reason: ExclusionReason::Cyclic,
        });
    }

    // A leaf is linked when it, or any of its ancestors, touches a dependency edge.
    for &i in &order {
        if summary[i] {
            continue;
        }
        let mut linked = graph.has_dependency_edge(i);
        let mut up = parent[i];
        while let (false, Some(p)) = (linked, up) {
            linked = graph.has_dependency_edge(p);
            up = parent[p];
        }
        if !linked {
            analyzed[i] = false;
            report.excluded.push(ExcludedTask {
                task_id: tasks[i].id.clone(),
                reason: ExclusionReason::Unlinked,
            });
        }
    }

    // Forward pass.
    let mut times = vec![Times::default(); n];
    let mut lags = vec![0i64; graph.edges.len()];
    for &i in &order {
        if summary[i] {
            let kids: Vec<usize> = children[i].iter().copied().filter(|&c| analyzed[c]).collect();
            if kids.is_empty() {
                analyzed[i] = false;
                continue;
            }
            times[i].es = kids.iter().map(|&c| times[c].es).min().unwrap_or_default();
            times[i].ef = kids.iter().map(|&c| times[c].ef).max().unwrap_or_default();
            continue;
        }
        if !analyzed[i] {
            continue;
        }

        let duration = tasks[i].effective_duration();
        let mut es = Span::of(&tasks[i]).start;
        for &e in &graph.incoming[i] {
            let edge = &graph.edges[e];
            if edge.kind != EdgeKind::Dependency || !analyzed[edge.from] {
                continue;
            }
            let pred = Span {
                start: times[edge.from].es,
                finish: times[edge.from].ef,
            };
            lags[e] = calendar.lag_in_working_days(pred.anchor(edge.dep_type), edge.lag_days);
            es = es.max(super::graph::required_start(pred, edge.dep_type, lags[e], duration));
        }
        times[i].es = es;
        times[i].ef = es + duration - 1;
    }

    let leaves: Vec<usize> = (0..n).filter(|&i| analyzed[i] && !summary[i]).collect();
    let Some(project_finish) = leaves.iter().map(|&i| times[i].ef).max() else {
        debug!("no linked tasks, critical path is empty");
        return report;
    };
    let project_start = leaves.iter().map(|&i| times[i].es).min().unwrap_or(project_finish);

    // Backward pass: parents come before children in reverse order.
    let mut finish_cap = vec![project_finish; n];
    let mut start_cap: Vec<Option<i64>> = vec![None; n];
    for &i in order.iter().rev() {
        if !analyzed[i] {
            continue;
        }
        let mut lf = finish_cap[i];
        let mut sc = start_cap[i];
        if let Some(p) = parent[i].filter(|&p| analyzed[p]) {
            lf = lf.min(finish_cap[p]);
            // a summary starts with its earliest child; only those carry its start bound
            if times[i].es == times[p].es {
                sc = min_opt(sc, start_cap[p]);
            }
        }
        for &e in &graph.outgoing[i] {
            let edge = &graph.edges[e];
            if edge.kind != EdgeKind::Dependency || !analyzed[edge.to] {
                continue;
            }
            let succ = times[edge.to];
            let lag = lags[e];
            match edge.dep_type {
                DependencyType::FS => lf = lf.min(succ.ls - 1 - lag),
                DependencyType::FF => lf = lf.min(succ.lf - lag),
                DependencyType::SS => sc = min_opt(sc, Some(succ.ls - lag)),
                DependencyType::SF => sc = min_opt(sc, Some(succ.lf + 1 - lag)),
            }
        }
        finish_cap[i] = lf;
        start_cap[i] = sc;

        if !summary[i] {
            let duration = tasks[i].effective_duration();
            let lf = match sc {
                Some(s) => lf.min(s + duration - 1),
                None => lf,
            };
            times[i].lf = lf;
            times[i].ls = lf - duration + 1;
        }
    }

    // Summaries: span of their analyzed children, bottom-up.
    for id in tree.post_order() {
        let Some(&i) = index.get(id.as_str()) else {
            continue;
        };
        if !summary[i] || !analyzed[i] {
            continue;
        }
        let kids: Vec<usize> = children[i].iter().copied().filter(|&c| analyzed[c]).collect();
        times[i].ls = kids.iter().map(|&c| times[c].ls).min().unwrap_or_default();
        times[i].lf = kids.iter().map(|&c| times[c].lf).max().unwrap_or_default();
    }

    // Summary slack is the smallest slack below it.
    let mut slack = vec![0i64; n];
    for id in tree.post_order() {
        let Some(&i) = index.get(id.as_str()) else {
            continue;
        };
        if !analyzed[i] {
            continue;
        }
        slack[i] = if summary[i] {
            children[i]
                .iter()
                .filter(|&&c| analyzed[c])
                .map(|&c| slack[c])
                .min()
                .unwrap_or_default()
        } else {
            times[i].ls - times[i].es
        };
    }

    for i in (0..n).filter(|&i| analyzed[i]) {
        let t = times[i];
        let (ef, lf) = if summary[i] || tasks[i].effective_duration() > 0 {
            (t.ef, t.lf)
        } else {
            // a milestone's finish is its own date
            (t.es, t.ls)
        };
        report.times.insert(
            tasks[i].id.clone(),
            CpmTimes {
                early_start: WorkCalendar::from_ordinal(t.es),
                early_finish: WorkCalendar::from_ordinal(ef),
                late_start: WorkCalendar::from_ordinal(t.ls),
                late_finish: WorkCalendar::from_ordinal(lf),
                slack_days: slack[i],
                is_critical: slack[i] <= critical_slack_days,
            },
        );
    }

    report.critical_path = order
        .iter()
        .copied()
        .filter(|&i| analyzed[i] && !summary[i] && slack[i] <= critical_slack_days)
        .map(|i| tasks[i].id.clone())
        .collect();
    report.project_start = Some(WorkCalendar::from_ordinal(project_start));
    let finish_date = leaves
        .iter()
        .map(|&i| if tasks[i].effective_duration() > 0 { times[i].ef } else { times[i].es })
        .max()
        .unwrap_or(project_finish);
    report.project_finish = Some(WorkCalendar::from_ordinal(finish_date));

    debug!(
        analyzed = report.times.len(),
        critical = report.critical_path.len(),
        excluded = report.excluded.len(),
        "critical path computed"
    );
    report
}

fn min_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dependency;
    use crate::scheduler::AutoScheduler;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn analyze(tasks: &[Task]) -> (Vec<Task>, CriticalPathReport) {
        let tree = TaskTree::build(tasks).unwrap();
        let scheduled = AutoScheduler::new().schedule(tasks, &tree).unwrap().tasks;
        let report = calculate_critical_path(&scheduled, &tree, &WorkCalendar::new(), 0);
        (scheduled, report)
    }

    fn abc(b_duration: i64) -> Vec<Task> {
        vec![
            Task::new("A", d(1, 1)).with_duration(3),
            Task::new("B", d(1, 1))
                .with_duration(b_duration)
                .with_predecessor(Dependency::new("A")),
            Task::new("C", d(1, 1))
                .with_duration(1)
                .with_predecessor(Dependency::new("A").with_lag(2)),
        ]
    }

    #[test]
    fn test_chain_through_longer_branch() {
        // B runs Thu..Tue and outlasts C (Mon).
        let (_, report) = analyze(&abc(4));
        assert_eq!(report.critical_path, vec!["A", "B"]);
        assert_eq!(report.slack("C"), Some(1));
        assert_eq!(report.project_finish, Some(d(1, 9)));
        assert!(report.is_critical("A"));
    }

    #[test]
    fn test_lagged_branch_can_be_critical() {
        // With B = 2 days (Thu..Fri), C on Monday finishes the project.
        let (_, report) = analyze(&abc(2));
        assert_eq!(report.critical_path, vec!["A", "C"]);
        assert_eq!(report.slack("B"), Some(1));
        let b = report.times["B"];
        assert_eq!(b.early_start, d(1, 4));
        assert_eq!(b.late_finish, d(1, 8));
    }

    #[test]
    fn test_unlinked_tasks_excluded() {
        let mut tasks = abc(4);
        tasks.push(Task::new("lonely", d(1, 1)).with_duration(20));
        let (_, report) = analyze(&tasks);
        assert!(report.times.get("lonely").is_none());
        assert_eq!(
            report.excluded,
            vec![ExcludedTask {
                task_id: "lonely".into(),
                reason: ExclusionReason::Unlinked,
            }]
        );
        assert_eq!(report.critical_path, vec!["A", "B"]);
    }

    #[test]
    fn test_cyclic_tasks_excluded() {
        let tasks = vec![
            Task::new("A", d(1, 1)).with_predecessor(Dependency::new("B")),
            Task::new("B", d(1, 1)).with_predecessor(Dependency::new("A")),
            Task::new("X", d(1, 1)).with_duration(2),
            Task::new("Y", d(1, 1)).with_predecessor(Dependency::new("X")),
        ];
        let tree = TaskTree::build(&tasks).unwrap();
        let report = calculate_critical_path(&tasks, &tree, &WorkCalendar::new(), 0);
        let cyclic: Vec<&str> = report
            .excluded
            .iter()
            .filter(|e| e.reason == ExclusionReason::Cyclic)
            .map(|e| e.task_id.as_str())
            .collect();
        assert_eq!(cyclic, vec!["A", "B"]);
        assert_eq!(report.critical_path, vec!["X", "Y"]);
    }

    #[test]
    fn test_summary_inherits_child_slack() {
        let tasks = vec![
            Task::new("A", d(1, 1)).with_duration(2),
            Task::new("S", d(1, 1)),
            Task::new("S1", d(1, 1))
                .with_parent("S")
                .with_duration(5)
                .with_predecessor(Dependency::new("A")),
            Task::new("S2", d(1, 1))
                .with_parent("S")
                .with_duration(1)
                .with_predecessor(Dependency::new("A")),
        ];
        let (_, report) = analyze(&tasks);
        assert_eq!(report.slack("S2"), Some(4));
        assert_eq!(report.slack("S"), Some(0));
        assert!(report.is_critical("S"));
        assert_eq!(report.critical_path, vec!["A", "S1"]);
    }

    #[test]
    fn test_summary_predecessor_bounds_children() {
        // S (S1 short, S2 long) → Z: every child must finish before Z.
        let tasks = vec![
            Task::new("S", d(1, 1)),
            Task::new("S1", d(1, 1)).with_parent("S").with_duration(1),
            Task::new("S2", d(1, 1)).with_parent("S").with_duration(3),
            Task::new("Z", d(1, 1))
                .with_duration(1)
                .with_predecessor(Dependency::new("S")),
        ];
        let (scheduled, report) = analyze(&tasks);
        let z = scheduled.iter().find(|t| t.id == "Z").unwrap();
        assert_eq!(z.start_date, d(1, 4));
        assert_eq!(report.critical_path, vec!["S2", "Z"]);
        assert_eq!(report.slack("S1"), Some(2));
    }

    #[test]
    fn test_summary_start_link_binds_earliest_child() {
        // S opens with S1 (Mon); S2 waits for X. Z starts with S.
        let tasks = vec![
            Task::new("X", d(1, 1)).with_duration(2),
            Task::new("S", d(1, 1)),
            Task::new("S1", d(1, 1)).with_parent("S").with_duration(5),
            Task::new("S2", d(1, 1))
                .with_parent("S")
                .with_duration(1)
                .with_predecessor(Dependency::new("X")),
            Task::new("Z", d(1, 1))
                .with_duration(10)
                .with_predecessor(Dependency::new("S").with_type(DependencyType::SS)),
        ];
        let (scheduled, report) = analyze(&tasks);
        let s2 = scheduled.iter().find(|t| t.id == "S2").unwrap();
        assert_eq!(s2.start_date, d(1, 3));
        assert_eq!(report.slack("S2"), Some(7));
        assert_eq!(report.slack("X"), Some(7));
        assert_eq!(report.slack("S1"), Some(0));
        assert_eq!(report.critical_path, vec!["S1", "Z"]);
        assert!(report.times.values().all(|t| t.slack_days >= 0));

        // SF from the summary: Z must finish no earlier than S starts
        let mut sf = tasks.clone();
        sf[4] = Task::new("Z", d(1, 1))
            .with_duration(1)
            .with_predecessor(Dependency::new("S").with_type(DependencyType::SF).with_lag(1));
        let (_, report) = analyze(&sf);
        assert!(report.times.values().all(|t| t.slack_days >= 0));
        assert_eq!(report.slack("X"), Some(2));
    }

    #[test]
    fn test_milestone_times() {
        let tasks = vec![
            Task::new("A", d(1, 1)).with_duration(2),
            Task::new("M", d(1, 1))
                .as_milestone()
                .with_predecessor(Dependency::new("A")),
        ];
        let (_, report) = analyze(&tasks);
        let m = report.times["M"];
        assert_eq!(m.early_start, d(1, 3));
        assert_eq!(m.early_finish, d(1, 3));
        assert_eq!(m.slack_days, 0);
        assert_eq!(report.critical_path, vec!["A", "M"]);
    }

    #[test]
    fn test_slack_threshold() {
        let tree_tasks = abc(4);
        let tree = TaskTree::build(&tree_tasks).unwrap();
        let scheduled = AutoScheduler::new().schedule(&tree_tasks, &tree).unwrap().tasks;
        let report = calculate_critical_path(&scheduled, &tree, &WorkCalendar::new(), 1);
        assert!(report.is_critical("C"));
    }

    #[test]
    fn test_apply_writes_fields() {
        let (mut scheduled, report) = analyze(&abc(4));
        report.apply(&mut scheduled);
        let c = scheduled.iter().find(|t| t.id == "C").unwrap();
        assert_eq!(c.total_slack_days, Some(1));
        assert!(!c.is_critical);
        assert_eq!(c.early_start, Some(d(1, 8)));
        assert_eq!(c.late_start, Some(d(1, 9)));
    }

    /// Random DAG of leaves `L0..Ln`, some grouped under single-level
    /// summaries `G*` over consecutive leaves. A link always runs from
    /// lower to higher leaf indices, so summaries can be on either end
    /// without forming a cycle.
    fn random_project(rng: &mut SmallRng) -> Vec<Task> {
        let n = rng.random_range(4..18);
        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;
        while i < n {
            let len = rng.random_range(1..4usize).min(n - i);
            if len >= 2 && rng.random_bool(0.5) {
                groups.push((i, i + len - 1));
            }
            i += len;
        }
        let group_of = |leaf: usize| groups.iter().position(|&(lo, hi)| (lo..=hi).contains(&leaf));

        // (id, lowest leaf, highest leaf)
        let mut nodes: Vec<(String, usize, usize)> =
            (0..n).map(|i| (format!("L{i}"), i, i)).collect();
        nodes.extend(groups.iter().enumerate().map(|(g, &(lo, hi))| (format!("G{g}"), lo, hi)));

        let mut tasks: Vec<Task> = Vec::new();
        for (id, lo, hi) in &nodes {
            let start = d(1, 1) + chrono::Duration::days(rng.random_range(0..10));
            let mut t = Task::new(id.clone(), start);
            if lo == hi {
                t = t.with_duration(rng.random_range(1..5));
                if let Some(g) = group_of(*lo) {
                    t = t.with_parent(format!("G{g}"));
                }
            }
            let candidates: Vec<&String> = nodes
                .iter()
                .filter(|(_, _, pred_hi)| pred_hi < lo)
                .map(|(pred, _, _)| pred)
                .collect();
            let links = if lo == hi { 1..3 } else { 0..3 };
            if !candidates.is_empty() {
                for _ in 0..rng.random_range(links) {
                    let pred = candidates[rng.random_range(0..candidates.len())];
                    t = t.with_predecessor(
                        Dependency::new(pred.clone())
                            .with_type(DependencyType::ALL[rng.random_range(0..4)])
                            .with_lag(rng.random_range(0..3)),
                    );
                }
            }
            tasks.push(t);
        }
        tasks
    }

    #[test]
    fn test_random_dags_consistent() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..60 {
            let tasks = random_project(&mut rng);
            let (_, report) = analyze(&tasks);
            let finish = report.project_finish.unwrap();
            for (id, t) in &report.times {
                assert!(t.slack_days >= 0, "negative slack on {id}");
                assert!(t.late_finish <= finish);
            }
            // the project finish is reached by at least one critical task
            assert!(report
                .critical_path
                .iter()
                .any(|id| report.times[id].late_finish == finish));

            // every critical task with predecessors follows a critical one
            for id in &report.critical_path {
                let task = tasks.iter().find(|t| &t.id == id).unwrap();
                let parent = task
                    .parent_id
                    .as_ref()
                    .and_then(|p| tasks.iter().find(|t| &t.id == p));
                let preds: Vec<&str> = task
                    .predecessors
                    .iter()
                    .chain(parent.into_iter().flat_map(|p| p.predecessors.iter()))
                    .map(|dep| dep.predecessor_id.as_str())
                    .collect();
                if !preds.is_empty() {
                    assert!(
                        preds.iter().any(|p| report.is_critical(p)),
                        "{id} is critical but none of {preds:?} is"
                    );
                }
            }
        }
    }
}
