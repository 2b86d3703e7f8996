//! # STRATA Alloc
//!
//! Instrumented allocation for the STRATA runtime.
//!
//! Every tracked allocation is prefixed with a descriptor that records its
//! size, kind and (optionally) the call stack that requested it. Descriptors
//! are threaded into one ledger per [`AllocKind`], which gives:
//!
//! - Detection of releases through the wrong kind
//! - Detection of releases of pointers that were never handed out
//! - Current, peak and cumulative usage counters
//! - Leak reports with resolved call stacks
//!
//! ## Architecture Rules
//!
//! 1. **No allocation under the ledger lock** - The tracker can be the global allocator
//! 2. **Never dereference foreign pointers** - Membership is checked by address first
//! 3. **Abort, don't unwind, from `GlobalAlloc`** - See [`TrackingAllocator`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_alloc::{global, TrackingAllocator};
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//!
//! fn main() {
//!     let data = vec![0u8; 1024];
//!     drop(data);
//!     global().log_summary();
//!     assert!(!global().report_leaks());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod align;
mod chunk;
pub mod config;
mod global;
mod stack;
mod stats;
mod tracker;

pub use align::{align_down, align_up, ALIGNMENT};
pub use config::{TrackerConfig, POISON_BYTE};
pub use global::TrackingAllocator;
pub use stack::{StackTrace, MAX_STACK_DEPTH};
pub use stats::AllocStats;
pub use strata_core::{AllocKind, MemoryError, MemoryResult};
pub use tracker::{global, AllocTracker, LiveAllocation};
