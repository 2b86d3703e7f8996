//! # Allocation Tracker
//!
//! Wraps the system allocator. Every chunk carries a header that is
//! linked into the ledger of its [`AllocKind`]; releasing a chunk checks that
//! ledger first, then the other one, and refuses anything found in neither.
//!
//! ## Locking
//!
//! One mutex guards both ledgers and the counters. It is held only while
//! linking, unlinking or counting. The system allocation, stack capture,
//! poisoning, logging and every `Vec` growth happen outside of it, which is
//! what lets the tracker serve as the global allocator without recursing
//! into its own lock.

use std::alloc::{handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use strata_core::chain::{DChain, NodeStore};
use strata_core::{AllocKind, MemoryError, MemoryResult};

use crate::chunk::{self, ChunkHeader, ChunkLayout, HeaderPtr, HeaderStore};
use crate::config::TrackerConfig;
use crate::stack::StackTrace;
use crate::stats::AllocStats;

/// Extra room reserved by [`AllocTracker::live`] for chunks allocated
/// between sizing the snapshot and taking it.
const SNAPSHOT_SLACK: usize = 64;

/// The process-wide tracker used by [`TrackingAllocator`](crate::TrackingAllocator).
static GLOBAL: AllocTracker = AllocTracker::new(TrackerConfig::DEFAULT);

/// Process-wide tracker.
#[inline]
#[must_use]
pub fn global() -> &'static AllocTracker {
    &GLOBAL
}

/// Snapshot of one live chunk.
#[derive(Clone, Copy, Debug)]
pub struct LiveAllocation {
    /// Allocation kind.
    pub kind: AllocKind,
    /// Payload address.
    pub address: usize,
    /// Payload bytes.
    pub size: usize,
    /// Allocation sequence number; higher is more recent.
    pub seq: u64,
    /// Call stack captured at allocation time.
    pub stack: StackTrace,
}

impl LiveAllocation {
    fn of(header: &ChunkHeader) -> Self {
        Self {
            kind: header.kind,
            address: header.payload,
            size: header.size,
            seq: header.seq,
            stack: header.stack,
        }
    }
}

/// Everything behind the tracker lock.
struct Ledgers {
    chains: [DChain<HeaderPtr>; 2],
    counts: [usize; 2],
    store: HeaderStore,
    stats: AllocStats,
    next_seq: u64,
}

/// Instrumented allocator with per-kind ledgers.
///
/// # Example
///
/// ```rust
/// # #![allow(unsafe_code)]
/// use std::alloc::Layout;
/// use strata_alloc::{AllocKind, AllocTracker, TrackerConfig};
///
/// let tracker = AllocTracker::new(TrackerConfig::debug());
/// let layout = Layout::new::<[u8; 32]>();
///
/// let ptr = tracker.allocate(AllocKind::Object, layout);
/// assert_eq!(tracker.stats().current_count, 1);
///
/// unsafe { tracker.release(AllocKind::Object, ptr, layout) };
/// assert_eq!(tracker.stats().current_count, 0);
/// ```
pub struct AllocTracker {
    config: TrackerConfig,
    ledgers: Mutex<Ledgers>,
}

impl AllocTracker {
    /// Creates a tracker with empty ledgers.
    #[must_use]
    pub const fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            ledgers: Mutex::new(Ledgers {
                chains: [DChain::new(), DChain::new()],
                counts: [0; 2],
                store: HeaderStore::new(),
                stats: AllocStats::new(),
                next_seq: 0,
            }),
        }
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Allocates and registers a chunk for `layout`.
    ///
    /// # Errors
    ///
    /// - [`MemoryError::CapacityOverflow`] if the chunk size overflows
    /// - [`MemoryError::OutOfMemory`] if the system allocator fails
    pub fn try_allocate(&self, kind: AllocKind, layout: Layout) -> MemoryResult<NonNull<u8>> {
        let chunk = ChunkLayout::for_payload(layout)?;
        let stack = if self.config.capture_stacks {
            StackTrace::capture(self.config.stack_depth)
        } else {
            StackTrace::EMPTY
        };

        let (header, payload) = chunk::allocate(&chunk, layout.size(), kind, stack).ok_or(
            MemoryError::OutOfMemory {
                size: layout.size(),
                kind,
            },
        )?;

        let mut ledgers = self.lock();
        let Ledgers {
            chains,
            counts,
            store,
            stats,
            next_seq,
        } = &mut *ledgers;

        store.node_mut(header).seq = *next_seq;
        *next_seq += 1;
        chains[kind.index()].push_first(store, header);
        counts[kind.index()] += 1;
        stats.record_alloc(layout.size());

        Ok(payload)
    }

    /// Allocates and registers a chunk for `layout`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk size overflows. Running out of memory goes through
    /// [`handle_alloc_error`], which aborts.
    #[must_use]
    pub fn allocate(&self, kind: AllocKind, layout: Layout) -> NonNull<u8> {
        match self.try_allocate(kind, layout) {
            Ok(ptr) => ptr,
            Err(MemoryError::OutOfMemory { size, kind }) => {
                tracing::error!(size, %kind, "system allocator failed");
                handle_alloc_error(layout)
            }
            Err(err) => panic!("{err}"),
        }
    }

    /// Unregisters and frees the chunk behind `ptr`.
    ///
    /// On error nothing is freed and both ledgers are left as they were.
    ///
    /// # Errors
    ///
    /// - [`MemoryError::KindMismatch`] if `ptr` is registered under the other kind
    /// - [`MemoryError::Unregistered`] if `ptr` is in neither ledger
    ///
    /// # Safety
    ///
    /// If `ptr` was returned by this tracker, `layout` must be the layout it was
    /// allocated with and the payload must no longer be in use. Pointers that
    /// were never returned by this tracker are rejected without being read.
    #[allow(unsafe_code)]
    pub unsafe fn try_release(
        &self,
        kind: AllocKind,
        ptr: NonNull<u8>,
        layout: Layout,
    ) -> MemoryResult<()> {
        let address = ptr.as_ptr() as usize;
        let unregistered = MemoryError::Unregistered {
            address,
            size: layout.size(),
            kind,
        };
        let Ok(chunk) = ChunkLayout::for_payload(layout) else {
            return Err(unregistered);
        };
        let Some(header) = chunk::header_of(ptr, &chunk) else {
            return Err(unregistered);
        };

        {
            let mut ledgers = self.lock();
            let Ledgers {
                chains,
                counts,
                store,
                stats,
                ..
            } = &mut *ledgers;

            if chains[kind.index()].has(store, header) {
                let size = store.node(header).size;
                chains[kind.index()].erase(store, header);
                counts[kind.index()] -= 1;
                stats.record_release(size);
            } else if chains[kind.other().index()].has(store, header) {
                return Err(MemoryError::KindMismatch {
                    address,
                    size: store.node(header).size,
                    allocated_as: kind.other(),
                    released_as: kind,
                });
            } else {
                return Err(unregistered);
            }
        }

        // SAFETY: the header was registered under `layout` and is now unlinked.
        unsafe { chunk::free(header, &chunk, self.config.poison) };
        Ok(())
    }

    /// Unregisters and frees the chunk behind `ptr`.
    ///
    /// # Panics
    ///
    /// Panics with the diagnostic on a kind mismatch or an unregistered pointer.
    ///
    /// # Safety
    ///
    /// Same contract as [`try_release`](Self::try_release).
    #[allow(unsafe_code)]
    pub unsafe fn release(&self, kind: AllocKind, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        if let Err(err) = unsafe { self.try_release(kind, ptr, layout) } {
            let stack = StackTrace::capture(self.config.stack_depth.max(8));
            tracing::error!(%err, stack = ?stack, "fatal release");
            panic!("{err}");
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> AllocStats {
        self.lock().stats
    }

    /// Live chunks of `kind`, most recently allocated first.
    ///
    /// The snapshot buffer is sized before the lock is taken, so this never
    /// allocates under the lock.
    #[must_use]
    pub fn live(&self, kind: AllocKind) -> Vec<LiveAllocation> {
        let mut snapshot: Vec<LiveAllocation> = Vec::new();
        loop {
            let count = self.lock().counts[kind.index()];
            snapshot.reserve(count + SNAPSHOT_SLACK);

            let ledgers = self.lock();
            if ledgers.counts[kind.index()] > snapshot.capacity() {
                continue;
            }
            for (_, header) in ledgers.chains[kind.index()].iter(&ledgers.store) {
                snapshot.push(LiveAllocation::of(header));
            }
            return snapshot;
        }
    }

    /// Logs every live chunk with its resolved call stack.
    ///
    /// Returns true iff anything is still allocated.
    pub fn report_leaks(&self) -> bool {
        let mut leaked = 0usize;
        for kind in AllocKind::ALL {
            for chunk in self.live(kind) {
                leaked += 1;
                tracing::warn!(
                    %kind,
                    address = chunk.address,
                    size = chunk.size,
                    seq = chunk.seq,
                    "leaked chunk"
                );
                for frame in chunk.stack.resolve() {
                    tracing::warn!("    {frame}");
                }
            }
        }

        if leaked > 0 {
            let stats = self.stats();
            tracing::warn!(
                chunks = leaked,
                bytes = stats.current_amount,
                "allocation leaks detected"
            );
        }
        leaked > 0
    }

    /// Logs current, peak and cumulative usage.
    pub fn log_summary(&self) {
        let stats = self.stats();
        tracing::info!(
            current_chunks = stats.current_count,
            current_mib = stats.current_mib(),
            max_chunks = stats.max_count,
            max_mib = stats.max_mib(),
            cumulative_chunks = stats.cumulative_count,
            cumulative_mib = stats.cumulative_mib(),
            "allocation summary"
        );
    }

    fn lock(&self) -> MutexGuard<'_, Ledgers> {
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    fn tracker() -> AllocTracker {
        AllocTracker::new(TrackerConfig::debug())
    }

    #[test]
    fn test_live_is_most_recent_first() {
        let tracker = tracker();
        let layout = Layout::new::<u64>();
        let ptrs: Vec<_> = (0..4)
            .map(|_| tracker.allocate(AllocKind::Array, layout))
            .collect();

        let live = tracker.live(AllocKind::Array);
        let seqs: Vec<u64> = live.iter().map(|chunk| chunk.seq).collect();
        assert_eq!(seqs, vec![3, 2, 1, 0]);
        assert_eq!(live[0].address, ptrs[3].as_ptr() as usize);
        assert!(tracker.live(AllocKind::Object).is_empty());

        for ptr in ptrs {
            unsafe { tracker.release(AllocKind::Array, ptr, layout) };
        }
        assert!(tracker.live(AllocKind::Array).is_empty());
    }

    #[test]
    fn test_mismatch_keeps_chunk_registered() {
        let tracker = tracker();
        let layout = Layout::new::<[u32; 8]>();
        let ptr = tracker.allocate(AllocKind::Object, layout);

        let err = unsafe { tracker.try_release(AllocKind::Array, ptr, layout) }.unwrap_err();
        assert!(matches!(
            err,
            MemoryError::KindMismatch {
                size: 32,
                allocated_as: AllocKind::Object,
                released_as: AllocKind::Array,
                ..
            }
        ));
        assert_eq!(tracker.stats().current_count, 1);

        unsafe { tracker.try_release(AllocKind::Object, ptr, layout) }.unwrap();
        assert_eq!(tracker.stats().current_count, 0);
    }

    #[test]
    fn test_stack_captured_when_enabled() {
        let tracker = tracker();
        let layout = Layout::new::<u8>();
        let ptr = tracker.allocate(AllocKind::Object, layout);
        assert!(!tracker.live(AllocKind::Object)[0].stack.is_empty());
        unsafe { tracker.release(AllocKind::Object, ptr, layout) };

        let quiet = AllocTracker::new(TrackerConfig::production());
        let ptr = quiet.allocate(AllocKind::Object, layout);
        assert!(quiet.live(AllocKind::Object)[0].stack.is_empty());
        unsafe { quiet.release(AllocKind::Object, ptr, layout) };
    }
}
