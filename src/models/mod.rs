//! Scheduling domain models.
//!
//! Provides the data types the engine transforms: tasks and their
//! dependency links, the working-day calendar, diagnostics, and the
//! records exchanged with the external work-order layer.
//!
//! # Domain Mappings
//!
//! | u-wbs | Construction | Software | Events |
//! |-------|--------------|----------|--------|
//! | Task | Work package | Story/Epic | Deliverable |
//! | Summary task | Phase | Epic | Workstream |
//! | Milestone | Inspection | Release | Go-live |
//! | Work order | Site order | Ticket | Vendor order |

mod calendar;
mod dependency;
mod diagnostics;
mod task;
mod work_order;

pub use calendar::{LagUnit, WorkCalendar, MAX_SPAN_DAYS};
pub use dependency::{Dependency, DependencyType};
pub use diagnostics::{
    ConstraintViolation, CycleKind, CycleReport, DanglingPredecessor, Diagnostics,
    ExcludedTask, ExclusionReason, OrphanReference, ParseFailure,
};
pub use task::{Task, TaskStatus};
pub use work_order::{TaskIntent, WorkOrderRecord, WorkOrderStatus};
