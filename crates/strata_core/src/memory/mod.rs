//! # Memory Management
//!
//! Block-growing slot arenas for same-sized objects.
//!
//! ## Design Philosophy
//!
//! - Storage grows one block at a time and is never compacted
//! - Allocation and deallocation are O(1) through an intrusive free-list
//! - Handles carry a generation, so stale handles are always detected

mod arena;

pub use arena::{SlotArena, SlotHandle};
