//! # STRATA Core
//!
//! Pool-backed building blocks for a native runtime:
//! - Slot arenas that grow block by block and reuse slots LIFO
//! - Intrusive chains threaded through caller-owned nodes
//! - Open-chaining hash maps and sets whose entries live in an arena
//!
//! ## Architecture Rules
//!
//! 1. **No per-element heap traffic** - Entries come from arena blocks
//! 2. **Entries never move** - Rehashing relinks, it does not copy
//! 3. **Single-threaded per instance** - No internal locking
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{BucketMap, SlotArena};
//!
//! let mut names: BucketMap<String, u32> = BucketMap::new();
//! names.add("a".to_owned(), 1);
//!
//! let mut arena = SlotArena::with_block_slots(8);
//! let handle = arena.allocate([0u8; 64]);
//! arena.deallocate(handle);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chain;
pub mod config;
pub mod error;
pub mod hash;
pub mod memory;

pub use chain::{Chain, ChainLinks, ChainNode, DChain, DChainLinks, DChainNode, NodeStore};
pub use config::{ArenaConfig, MemoryConfig, TableConfig};
pub use error::{AllocKind, MemoryError, MemoryResult};
pub use hash::{BucketMap, BucketSet, DefaultHashBuilder};
pub use memory::{SlotArena, SlotHandle};
