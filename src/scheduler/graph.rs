//! Dependency graph over a project's tasks.
//!
//! Nodes are task positions in the input slice. Two kinds of edges:
//! - **Dependency** edges `pred → succ` from parsed predecessor links. A link
//!   owned by a summary task is applied to each of its leaf descendants.
//! - **Rollup** edges `child → parent`, so every summary is ordered after
//!   its children and its rolled-up dates are resolved before any successor
//!   reads them.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks", CACM 5(11)

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;

use crate::models::{DanglingPredecessor, DependencyType, Task, WorkCalendar};
use crate::tree::TaskTree;

/// Edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    Dependency,
    Rollup,
}

#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
    pub dep_type: DependencyType,
    pub lag_days: i64,
}

/// Adjacency lists plus the dangling links found while building them.
#[derive(Debug, Clone)]
pub(crate) struct DependencyGraph {
    pub edges: Vec<Edge>,
    pub incoming: Vec<Vec<usize>>,
    pub outgoing: Vec<Vec<usize>>,
    pub dangling: Vec<DanglingPredecessor>,
}

impl DependencyGraph {
    pub fn build(tasks: &[Task], tree: &TaskTree) -> Self {
        let index: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        let mut graph = Self {
            edges: Vec::new(),
            incoming: vec![Vec::new(); tasks.len()],
            outgoing: vec![Vec::new(); tasks.len()],
            dangling: Vec::new(),
        };

        for (succ_idx, task) in tasks.iter().enumerate() {
            if let Some(parent_idx) = tree.parent_of(&task.id).and_then(|p| index.get(p)) {
                graph.push(Edge {
                    from: succ_idx,
                    to: *parent_idx,
                    kind: EdgeKind::Rollup,
                    dep_type: DependencyType::FS,
                    lag_days: 0,
                });
            }

            if task.predecessors.is_empty() {
                continue;
            }
            let targets: Vec<usize> = if tree.is_summary(&task.id) {
                tree.leaf_descendants(&task.id)
                    .iter()
                    .filter_map(|id| index.get(id.as_str()).copied())
                    .collect()
            } else {
                vec![succ_idx]
            };

            for dep in &task.predecessors {
                let Some(&pred_idx) = index.get(dep.predecessor_id.as_str()) else {
                    graph.dangling.push(DanglingPredecessor {
                        task_id: task.id.clone(),
                        predecessor_id: dep.predecessor_id.clone(),
                    });
                    continue;
                };
                for &to in &targets {
                    graph.push(Edge {
                        from: pred_idx,
                        to,
                        kind: EdgeKind::Dependency,
                        dep_type: dep.dep_type,
                        lag_days: dep.lag_days,
                    });
                }
            }
        }

        graph
    }

    fn push(&mut self, edge: Edge) {
        let e = self.edges.len();
        self.outgoing[edge.from].push(e);
        self.incoming[edge.to].push(e);
        self.edges.push(edge);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.incoming.len()
    }

    /// Whether any dependency edge starts or ends at the node.
    pub fn has_dependency_edge(&self, node: usize) -> bool {
        self.incoming[node]
            .iter()
            .chain(self.outgoing[node].iter())
            .any(|&e| self.edges[e].kind == EdgeKind::Dependency)
    }

    /// Dependency edges ending at the node.
    pub fn dependency_edges_into(&self, node: usize) -> impl Iterator<Item = &Edge> {
        self.incoming[node]
            .iter()
            .map(|&e| &self.edges[e])
            .filter(|e| e.kind == EdgeKind::Dependency)
    }

    /// Kahn's algorithm.
    ///
    /// Returns the topological order of every node that could be dequeued
    /// and, separately, the nodes left with residual in-edges.
    pub fn kahn(&self) -> (Vec<usize>, Vec<usize>) {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &e in &self.outgoing[node] {
                let to = self.edges[e].to;
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }

        let stuck = (0..n).filter(|&i| in_degree[i] > 0).collect();
        (order, stuck)
    }

    /// Reduces the residual node set to nodes on or between cycles by
    /// repeatedly discarding nodes with no out-edge inside the set.
    pub fn cycle_core(&self, stuck: &[usize]) -> Vec<usize> {
        let mut alive = vec![false; self.len()];
        for &i in stuck {
            alive[i] = true;
        }
        let mut out_degree: Vec<usize> = (0..self.len())
            .map(|i| {
                self.outgoing[i]
                    .iter()
                    .filter(|&&e| alive[self.edges[e].to])
                    .count()
            })
            .collect();

        let mut sinks: Vec<usize> = stuck.iter().copied().filter(|&i| out_degree[i] == 0).collect();
        while let Some(node) = sinks.pop() {
            alive[node] = false;
            for &e in &self.incoming[node] {
                let from = self.edges[e].from;
                if alive[from] {
                    out_degree[from] -= 1;
                    if out_degree[from] == 0 {
                        sinks.push(from);
                    }
                }
            }
        }

        stuck.iter().copied().filter(|&i| alive[i]).collect()
    }
}

/// Working-day span of a task: `finish = start - 1` for zero-duration tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: i64,
    pub finish: i64,
}

impl Span {
    pub fn new(start: i64, duration: i64) -> Self {
        Self {
            start,
            finish: start + duration - 1,
        }
    }

    /// Span of a task from its dates.
    pub fn of(task: &Task) -> Self {
        let start = WorkCalendar::ordinal(task.start_date);
        if task.effective_duration() == 0 && !task.is_summary {
            return Self::new(start, 0);
        }
        let end = if WorkCalendar::is_working_day(task.end_date) {
            WorkCalendar::ordinal(task.end_date)
        } else {
            WorkCalendar::ordinal(task.end_date) - 1
        };
        Self {
            start,
            finish: end.max(start),
        }
    }

    /// Date the relation is measured from, used to convert calendar-day lags.
    pub fn anchor(&self, dep_type: DependencyType) -> NaiveDate {
        let ordinal = match dep_type {
            DependencyType::FS => self.finish + 1,
            DependencyType::FF => self.finish,
            DependencyType::SS | DependencyType::SF => self.start,
        };
        WorkCalendar::from_ordinal(ordinal)
    }
}

/// Earliest start ordinal a successor of `succ_duration` days may take.
pub(crate) fn required_start(
    pred: Span,
    dep_type: DependencyType,
    lag: i64,
    succ_duration: i64,
) -> i64 {
    let tail = succ_duration - 1;
    match dep_type {
        DependencyType::FS => pred.finish + 1 + lag,
        DependencyType::SS => pred.start + lag,
        DependencyType::FF => pred.finish + lag - tail,
        DependencyType::SF => pred.start - 1 + lag - tail,
    }
}
