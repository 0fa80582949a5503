//! WBS / Gantt scheduling engine for the U-Engine ecosystem.
//!
//! Turns a project's flat task list plus one user edit into a new,
//! consistent task list: hierarchy and WBS codes, parsed dependency links,
//! auto-scheduled dates, critical path, and summary rollups. The engine is
//! a pure, synchronous transform; the caller owns the task array.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Dependency`, `WorkCalendar`,
//!   `Diagnostics`, `WorkOrderRecord`, `TaskIntent`
//! - **`predecessor`**: Compact dependency expressions (`"3FS+2,5SS-1,7"`)
//! - **`tree`**: Task forest and WBS numbering
//! - **`scheduler`**: Auto-scheduler, critical path method, project KPIs
//! - **`rollup`**: Summary dates/progress and work-order progress sync
//! - **`edit`**: User edits (create, patch, delete, reparent, indent, ...)
//! - **`engine`**: The recompute pipeline and its configuration
//! - **`validation`**: Input integrity checks (duplicate IDs, value ranges)
//! - **`error`**: Fatal error types
//!
//! # Architecture
//!
//! This crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem, next
//! to `u-schedule`. Persistence, rendering and the work-order store are
//! host concerns; the engine only consumes and produces task records.
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - Kahn (1962), "Topological sorting of large networks"
//! - PMI (2017), "A Guide to the Project Management Body of Knowledge"

pub mod edit;
pub mod engine;
pub mod error;
pub mod models;
pub mod predecessor;
pub mod rollup;
pub mod scheduler;
pub mod tree;
pub mod validation;

pub use edit::{apply_edit, TaskEdit, TaskPatch};
pub use engine::{Engine, EngineConfig, Recomputation, Rejection};
pub use error::EngineError;
