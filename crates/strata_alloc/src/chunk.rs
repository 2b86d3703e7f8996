//! # Tracked Chunks
//!
//! Every tracked allocation is one system allocation laid out as:
//!
//! ```text
//! base                           base + offset
//! │ ChunkHeader │ padding        │ payload (layout.size() bytes) │
//! ```
//!
//! `offset` is the header size rounded up to `max(ALIGNMENT, layout.align())`,
//! so the payload keeps the alignment the caller asked for and the header can
//! be recovered from the payload pointer by subtraction alone.
//!
//! This is the only module that dereferences chunk memory.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, LayoutError, System};
use std::ptr::{self, NonNull};

use strata_core::chain::{ChainNode, DChainLinks, DChainNode, NodeStore};
use strata_core::{AllocKind, MemoryError, MemoryResult};

use crate::align::ALIGNMENT;
use crate::config::POISON_BYTE;
use crate::stack::StackTrace;

/// Descriptor stored in front of every payload.
pub(crate) struct ChunkHeader {
    links: DChainLinks<HeaderPtr>,
    pub(crate) size: usize,
    pub(crate) kind: AllocKind,
    pub(crate) seq: u64,
    pub(crate) payload: usize,
    pub(crate) stack: StackTrace,
}

impl ChainNode<HeaderPtr> for ChunkHeader {
    #[inline]
    fn next(&self, index: usize) -> Option<HeaderPtr> {
        self.links.next(index)
    }

    #[inline]
    fn set_next(&mut self, index: usize, next: Option<HeaderPtr>) {
        self.links.set_next(index, next);
    }
}

impl DChainNode<HeaderPtr> for ChunkHeader {
    #[inline]
    fn prev(&self, index: usize) -> Option<HeaderPtr> {
        self.links.prev(index)
    }

    #[inline]
    fn set_prev(&mut self, index: usize, prev: Option<HeaderPtr>) {
        self.links.set_prev(index, prev);
    }
}

/// Address of a chunk header. Comparing two is always safe; dereferencing
/// goes through [`HeaderStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeaderPtr(NonNull<ChunkHeader>);

// SAFETY: the pointee is only touched through `HeaderStore`, which is only
// reachable while holding the tracker lock.
unsafe impl Send for HeaderPtr {}

/// Chunk and payload placement for one payload layout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChunkLayout {
    chunk: Layout,
    offset: usize,
}

impl ChunkLayout {
    /// Computes the chunk layout wrapping `payload`.
    pub(crate) fn for_payload(payload: Layout) -> MemoryResult<Self> {
        let overflow = |_: LayoutError| MemoryError::CapacityOverflow {
            requested: payload.size(),
        };
        let align = payload.align().max(ALIGNMENT);
        let header = Layout::new::<ChunkHeader>()
            .align_to(align)
            .map_err(overflow)?
            .pad_to_align();
        let (chunk, offset) = header
            .extend(payload.align_to(align).map_err(overflow)?)
            .map_err(overflow)?;

        Ok(Self {
            chunk: chunk.pad_to_align(),
            offset,
        })
    }

    /// Total chunk size, header included.
    #[inline]
    pub(crate) const fn size(&self) -> usize {
        self.chunk.size()
    }
}

/// Allocates a chunk from the system allocator and writes its header.
///
/// Returns `None` if the system allocator fails.
pub(crate) fn allocate(
    layout: &ChunkLayout,
    size: usize,
    kind: AllocKind,
    stack: StackTrace,
) -> Option<(HeaderPtr, NonNull<u8>)> {
    // SAFETY: a chunk always contains a header, so its size is non-zero.
    let base = NonNull::new(unsafe { System.alloc(layout.chunk) })?;
    let header = base.cast::<ChunkHeader>();

    // SAFETY: `offset <= chunk size`, so the payload pointer stays inside (or
    // one past) the allocation and cannot be null.
    let payload = unsafe { NonNull::new_unchecked(base.as_ptr().add(layout.offset)) };

    // SAFETY: `base` is fresh, aligned to at least `align_of::<ChunkHeader>()`
    // and large enough for a header.
    unsafe {
        header.as_ptr().write(ChunkHeader {
            links: DChainLinks::new(),
            size,
            kind,
            seq: 0,
            payload: payload.as_ptr() as usize,
            stack,
        });
    }

    Some((HeaderPtr(header), payload))
}

/// Header address a payload pointer would have. Nothing is dereferenced, so
/// this is fine for pointers that were never tracked.
#[inline]
pub(crate) fn header_of(payload: NonNull<u8>, layout: &ChunkLayout) -> Option<HeaderPtr> {
    let base = payload.as_ptr().wrapping_sub(layout.offset);
    NonNull::new(base.cast::<ChunkHeader>()).map(HeaderPtr)
}

/// Optionally poisons a chunk, then returns it to the system allocator.
///
/// # Safety
///
/// `header` must come from [`allocate`] with this `layout`, must already be
/// unlinked from every ledger and must not be used afterwards.
pub(crate) unsafe fn free(header: HeaderPtr, layout: &ChunkLayout, poison: bool) {
    let base = header.0.as_ptr().cast::<u8>();
    if poison {
        // SAFETY: the whole chunk is ours until it is deallocated below.
        unsafe { ptr::write_bytes(base, POISON_BYTE, layout.size()) };
    }
    // SAFETY: `base` was allocated by `System` with `layout.chunk`.
    unsafe { System.dealloc(base, layout.chunk) };
}

/// Node store over registered chunk headers.
///
/// Only headers that are linked into a ledger (or were just returned by
/// [`allocate`]) may be passed in. The tracker keeps its one store inside the
/// ledger mutex, which is what serializes every access.
pub(crate) struct HeaderStore {
    _locked: (),
}

impl HeaderStore {
    pub(crate) const fn new() -> Self {
        Self { _locked: () }
    }
}

impl NodeStore<HeaderPtr> for HeaderStore {
    type Node = ChunkHeader;

    #[inline]
    fn node(&self, id: HeaderPtr) -> &ChunkHeader {
        // SAFETY: registered headers stay allocated until unlinked, and the
        // ledger lock is held for the lifetime of `&self`.
        unsafe { id.0.as_ref() }
    }

    #[inline]
    fn node_mut(&mut self, id: HeaderPtr) -> &mut ChunkHeader {
        // SAFETY: as above; `&mut self` means no other header borrow is live.
        unsafe { &mut *id.0.as_ptr() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_respects_alignment() {
        for align in [1, 8, 16, 64, 4096] {
            let payload = Layout::from_size_align(24, align).unwrap();
            let layout = ChunkLayout::for_payload(payload).unwrap();
            assert_eq!(layout.offset % align.max(ALIGNMENT), 0);
            assert!(layout.offset >= std::mem::size_of::<ChunkHeader>());
            assert!(layout.size() >= layout.offset + 24);
        }
    }

    #[test]
    fn test_allocate_and_recover_header() {
        let payload = Layout::from_size_align(32, 16).unwrap();
        let layout = ChunkLayout::for_payload(payload).unwrap();
        let (header, ptr) = allocate(&layout, 32, AllocKind::Object, StackTrace::EMPTY).unwrap();

        assert_eq!(ptr.as_ptr() as usize % 16, 0);
        assert_eq!(header_of(ptr, &layout), Some(header));

        let store = HeaderStore::new();
        assert_eq!(store.node(header).size, 32);
        assert_eq!(store.node(header).payload, ptr.as_ptr() as usize);

        unsafe { free(header, &layout, true) };
    }

    #[test]
    fn test_header_of_low_address_is_none() {
        let payload = Layout::new::<u64>();
        let layout = ChunkLayout::for_payload(payload).unwrap();
        let low = NonNull::new(layout.offset as *mut u8).unwrap();
        assert_eq!(header_of(low, &layout), None);
    }
}
