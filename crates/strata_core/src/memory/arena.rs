//! # Slot Arena
//!
//! Fixed-size slots carved from growable blocks.
//!
//! ```text
//! blocks[0]: [ occ | free ─┐ | occ | free ─┐ ]
//! blocks[1]: [ occ | occ | free ◄┘ | ...  ◄┘ ]
//!                               ▲
//!                          free_slot
//! ```
//!
//! Every block holds exactly `block_slots` slots. The free-list is threaded
//! through the vacant slots themselves (each vacant slot stores the index of
//! the next vacant one), so reuse is LIFO and O(1). Blocks are only created
//! when the free-list runs dry and are only destroyed all at once by
//! [`SlotArena::free`] or on drop.

use std::fmt;
use std::mem;

use crate::config::{ArenaConfig, DEFAULT_BLOCK_SLOTS, MAX_BLOCK_SLOTS};
use crate::error::MemoryError;

/// Highest slot count an arena can reach; slot indices are 32-bit.
const MAX_SLOTS: usize = u32::MAX as usize;

/// Handle to an occupied slot.
///
/// The handle is split into two parts:
/// - Lower 32 bits: flat slot index (`block * block_slots + offset`)
/// - Upper 32 bits: generation of the slot when it was handed out
///
/// A slot's generation is bumped every time it is deallocated, so a handle
/// that outlives its slot never resolves to the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SlotHandle(u64);

impl SlotHandle {
    /// Creates a handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Flat slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation the slot had when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

/// One unit of storage.
#[cfg_attr(feature = "simd-align", repr(align(16)))]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

enum SlotState<T> {
    /// Free-list link to the next vacant slot.
    Vacant { next_free: Option<u32> },
    Occupied(T),
}

/// A block-growing pool of fixed-size slots.
///
/// # Thread Safety
///
/// Not synchronized. Use one arena per thread or serialize access externally.
///
/// # Example
///
/// ```rust
/// use strata_core::SlotArena;
///
/// let mut arena: SlotArena<u64> = SlotArena::with_block_slots(8);
/// let handles: Vec<_> = (0..9).map(|i| arena.allocate(i)).collect();
///
/// assert_eq!(arena.block_count(), 2);
/// assert_eq!(arena.capacity(), 16);
///
/// for handle in handles {
///     arena.deallocate(handle);
/// }
/// arena.free();
/// ```
pub struct SlotArena<T> {
    /// Block list. Each block is a boxed slice, so slots never move.
    blocks: Vec<Box<[Slot<T>]>>,
    /// Head of the cross-block free-list.
    free_slot: Option<u32>,
    /// Slots per block.
    block_slots: usize,
    /// Number of occupied slots.
    len: usize,
    /// Generation given to slots of newly grown blocks. Raised by `free` past
    /// every generation already issued.
    epoch: u32,
}

impl<T> SlotArena<T> {
    /// Creates an empty arena with the default block size.
    ///
    /// No storage is allocated until the first [`allocate`](Self::allocate).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            free_slot: None,
            block_slots: DEFAULT_BLOCK_SLOTS,
            len: 0,
            epoch: 0,
        }
    }

    /// Creates an empty arena whose blocks hold `block_slots` slots.
    ///
    /// # Panics
    ///
    /// Panics if `block_slots` is zero or larger than [`MAX_BLOCK_SLOTS`].
    #[must_use]
    pub fn with_block_slots(block_slots: usize) -> Self {
        assert!(
            block_slots > 0 && block_slots <= MAX_BLOCK_SLOTS,
            "block_slots must be in 1..={MAX_BLOCK_SLOTS}, got {block_slots}"
        );
        Self {
            blocks: Vec::new(),
            free_slot: None,
            block_slots,
            len: 0,
            epoch: 0,
        }
    }

    /// Creates an empty arena sized by `config`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration was not validated and is unusable.
    #[must_use]
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self::with_block_slots(config.block_slots)
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True iff no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots across all blocks.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.block_slots
    }

    /// Slots per block.
    #[inline]
    #[must_use]
    pub const fn block_slots(&self) -> usize {
        self.block_slots
    }

    /// Number of blocks allocated so far.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Size of one slot in bytes, including the generation tag.
    #[inline]
    #[must_use]
    pub const fn slot_size() -> usize {
        mem::size_of::<Slot<T>>()
    }

    /// Stores `value` in a free slot and returns its handle.
    ///
    /// Amortized O(1). When the free-list is empty a new block is allocated,
    /// its first slot is returned and the rest are threaded onto the free-list.
    ///
    /// # Panics
    ///
    /// Panics if the arena would exceed the 32-bit slot index space.
    pub fn allocate(&mut self, value: T) -> SlotHandle {
        let Some(index) = self.free_slot else {
            return self.grow(value);
        };

        let slot = self.slot_mut(index);
        let next_free = match slot.state {
            SlotState::Vacant { next_free } => next_free,
            SlotState::Occupied(_) => unreachable!("free-list points at occupied slot {index}"),
        };
        slot.state = SlotState::Occupied(value);
        let generation = slot.generation;

        self.free_slot = next_free;
        self.len += 1;

        SlotHandle::new(index, generation)
    }

    /// Releases the slot behind `handle` and returns the value it held.
    ///
    /// The slot goes to the head of the free-list and its generation is bumped,
    /// so `handle` (and any copy of it) is dead from here on.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale (double free) or was issued by another arena.
    pub fn deallocate(&mut self, handle: SlotHandle) -> T {
        let index = handle.index();
        let free_slot = self.free_slot;
        let capacity = self.capacity();

        let Some(slot) = self.slot_at_mut(index) else {
            panic!("slot handle {handle:?} outside arena of capacity {capacity}");
        };
        let live = slot.generation == handle.generation()
            && matches!(slot.state, SlotState::Occupied(_));
        assert!(live, "stale slot handle {handle:?}: double free or foreign handle");

        let state = mem::replace(&mut slot.state, SlotState::Vacant { next_free: free_slot });
        slot.generation = slot.generation.wrapping_add(1);

        self.free_slot = Some(index);
        self.len -= 1;

        match state {
            SlotState::Occupied(value) => value,
            SlotState::Vacant { .. } => unreachable!(),
        }
    }

    /// Value behind `handle`, or `None` if the handle is stale.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        let slot = self.slot_at(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        match &slot.state {
            SlotState::Occupied(value) => Some(value),
            SlotState::Vacant { .. } => None,
        }
    }

    /// Mutable value behind `handle`, or `None` if the handle is stale.
    #[inline]
    pub fn get_mut(&mut self, handle: SlotHandle) -> Option<&mut T> {
        let slot = self.slot_at_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        match &mut slot.state {
            SlotState::Occupied(value) => Some(value),
            SlotState::Vacant { .. } => None,
        }
    }

    /// True iff `handle` refers to a live slot of this arena.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: SlotHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Releases every block.
    ///
    /// Expects the arena to be empty. If slots are still occupied the blocks
    /// are leaked (their values are not dropped) and a warning is logged.
    ///
    /// Handles issued before the call stay stale afterwards: slots of blocks
    /// grown later start at a generation none of them carries.
    pub fn free(&mut self) {
        if self.blocks.is_empty() {
            return;
        }

        let blocks = mem::take(&mut self.blocks);
        let highest = blocks
            .iter()
            .flat_map(|block| block.iter())
            .map(|slot| slot.generation.wrapping_sub(self.epoch))
            .max()
            .unwrap_or(0);
        self.epoch = self.epoch.wrapping_add(highest).wrapping_add(1);

        if self.len == 0 {
            drop(blocks);
        } else {
            tracing::warn!(
                live = self.len,
                blocks = blocks.len(),
                slot_size = Self::slot_size(),
                "slot arena freed with live slots, leaking its blocks"
            );
            mem::forget(blocks);
        }

        self.free_slot = None;
        self.len = 0;
    }

    /// Iterates over occupied slots in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        let block_slots = self.block_slots;
        self.blocks.iter().enumerate().flat_map(move |(b, block)| {
            block.iter().enumerate().filter_map(move |(offset, slot)| match &slot.state {
                SlotState::Occupied(value) => Some((
                    SlotHandle::new(flat_index(b, block_slots, offset), slot.generation),
                    value,
                )),
                SlotState::Vacant { .. } => None,
            })
        })
    }

    /// Iterates mutably over occupied slots in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotHandle, &mut T)> {
        let block_slots = self.block_slots;
        self.blocks.iter_mut().enumerate().flat_map(move |(b, block)| {
            block.iter_mut().enumerate().filter_map(move |(offset, slot)| {
                let generation = slot.generation;
                match &mut slot.state {
                    SlotState::Occupied(value) => Some((
                        SlotHandle::new(flat_index(b, block_slots, offset), generation),
                        value,
                    )),
                    SlotState::Vacant { .. } => None,
                }
            })
        })
    }

    /// Allocates a new block, returns its first slot and threads the rest
    /// onto the (empty) free-list.
    #[cold]
    fn grow(&mut self, value: T) -> SlotHandle {
        let base = self.capacity();
        let end = base.saturating_add(self.block_slots);
        if end > MAX_SLOTS {
            panic!("{}", MemoryError::CapacityOverflow { requested: end });
        }

        let generation = self.epoch;
        let mut block = Vec::with_capacity(self.block_slots);
        block.push(Slot {
            generation,
            state: SlotState::Occupied(value),
        });
        for i in 1..self.block_slots {
            let next_free = (i + 1 < self.block_slots).then(|| to_index(base + i + 1));
            block.push(Slot {
                generation,
                state: SlotState::Vacant { next_free },
            });
        }
        self.blocks.push(block.into_boxed_slice());

        self.free_slot = (self.block_slots > 1).then(|| to_index(base + 1));
        self.len += 1;

        tracing::debug!(
            blocks = self.blocks.len(),
            capacity = end,
            slot_size = Self::slot_size(),
            "slot arena grew by one block"
        );

        SlotHandle::new(to_index(base), generation)
    }

    #[inline]
    fn slot_at(&self, index: u32) -> Option<&Slot<T>> {
        let index = index as usize;
        self.blocks
            .get(index / self.block_slots)?
            .get(index % self.block_slots)
    }

    #[inline]
    fn slot_at_mut(&mut self, index: u32) -> Option<&mut Slot<T>> {
        let index = index as usize;
        let block_slots = self.block_slots;
        self.blocks
            .get_mut(index / block_slots)?
            .get_mut(index % block_slots)
    }

    #[inline]
    fn slot_mut(&mut self, index: u32) -> &mut Slot<T> {
        match self.slot_at_mut(index) {
            Some(slot) => slot,
            None => unreachable!("free-list index {index} outside arena"),
        }
    }
}

#[inline]
fn flat_index(block: usize, block_slots: usize, offset: usize) -> u32 {
    to_index(block * block_slots + offset)
}

#[inline]
fn to_index(index: usize) -> u32 {
    debug_assert!(index <= MAX_SLOTS);
    index as u32
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SlotArena<T> {
    fn drop(&mut self) {
        self.free();
    }
}

impl<T> fmt::Debug for SlotArena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("block_slots", &self.block_slots)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
