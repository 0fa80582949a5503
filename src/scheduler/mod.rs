//! Dependency scheduling and critical path analysis.
//!
//! # Algorithm
//!
//! Both passes share one dependency graph: predecessor links (summary
//! successors expanded to their leaves) plus child→parent rollup edges,
//! ordered with Kahn's algorithm. [`AutoScheduler`] moves each unpinned
//! task to the earliest start its links allow; [`calculate_critical_path`]
//! then runs the two-pass CPM over the scheduled dates.
//!
//! # KPI
//!
//! [`ProjectKpi`] summarizes span, progress, critical and overdue counts.
//!
//! # References
//!
//! - Kahn (1962), "Topological sorting of large networks"
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2017), "PMBOK Guide", 6.5: Develop Schedule

mod auto;
mod critical;
mod graph;
mod kpi;

pub use auto::{auto_schedule_tasks, AutoScheduler, ScheduleOutcome};
pub use critical::{calculate_critical_path, CpmTimes, CriticalPathReport};
pub use kpi::ProjectKpi;
