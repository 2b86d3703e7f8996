//! # Intrusive Chains
//!
//! Linked lists whose links live inside the nodes they order.
//!
//! ## Design Philosophy
//!
//! - A chain stores only end ids; nodes live in a caller-owned [`NodeStore`]
//! - Link fields are indexed, so one node can be in several chains at once
//! - Chains never allocate and never drop nodes unless asked to
//!   (`destroy_all`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut arena = SlotArena::new();
//! let mut ready: DChain<SlotHandle> = DChain::new();
//!
//! let task = arena.allocate(Task::new());
//! ready.push_last(&mut arena, task);
//! ready.erase(&mut arena, task);
//! ```

mod dlist;
mod node;
mod slist;

pub use dlist::{DChain, DChainRevIter};
pub use node::{ChainLinks, ChainNode, DChainLinks, DChainNode, NodeRelease, NodeStore};
pub use slist::{Chain, ChainIter};
