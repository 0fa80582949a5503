//! Task hierarchy: forest assembly and WBS numbering.
//!
//! # Algorithm
//!
//! [`TaskTree::build`] groups tasks by `parent_id` in one pass, sorts each
//! sibling set by `order`, and walks every ancestor chain once to reject
//! cycles. [`recalculate_wbs`] numbers the forest depth-first.
//!
//! # Complexity
//! O(n log n) for sibling sorting, O(n) for cycle checks and numbering.

mod builder;
mod wbs;

pub use builder::TaskTree;
pub use wbs::{apply_wbs, compare_wbs, recalculate_wbs};
