//! Free-time arithmetic and task ordering.
//!
//! This module provides:
//! - Busy interval merging and free slot detection with edge buffers
//! - Slot consumption after a block is placed
//! - Urgency scoring for open tasks

pub mod finder;
mod priority;

pub use finder::{apply_buffer, consume, filter_min_duration, merge_overlapping, subtract, SlotFinder};
pub use priority::{ScoredTask, TaskPrioritizer};
