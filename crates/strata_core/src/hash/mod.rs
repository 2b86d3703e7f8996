//! # Bucket Tables
//!
//! Open-chaining hash containers whose entries are carved from a
//! [`SlotArena`](crate::SlotArena).
//!
//! ## Growth
//!
//! | Event | New bucket count |
//! |-------|------------------|
//! | first insert | 1 (or the requested capacity) |
//! | `len + 1 > capacity` | `max(len + 1, capacity * 3 / 2)` |
//! | `trim()` | `len * 4 / 3`, rounded; 0 releases the arena |
//!
//! Entries cache their hash, so a rehash never calls the hasher again.

pub mod map;
pub mod set;
mod table;

pub use map::BucketMap;
pub use set::BucketSet;
pub use table::DefaultHashBuilder;
