//! # Global Allocator Adapter
//!
//! Routes `alloc`/`dealloc` through the process-wide tracker:
//!
//! ```rust,ignore
//! use strata_alloc::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//! ```
//!
//! Without the `track-allocs` feature every call forwards to `System`
//! and nothing is recorded.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout};

#[cfg(not(feature = "track-allocs"))]
use std::alloc::System;

#[cfg(feature = "track-allocs")]
use std::ptr::{self, NonNull};

#[cfg(feature = "track-allocs")]
use strata_core::{AllocKind, MemoryError};

#[cfg(feature = "track-allocs")]
use crate::stack::{StackTrace, MAX_STACK_DEPTH};
#[cfg(feature = "track-allocs")]
use crate::tracker::global;

/// `GlobalAlloc` front end of [`global()`](crate::global).
///
/// All traffic is recorded as [`AllocKind::Object`](strata_core::AllocKind::Object);
/// the standard allocator interface does not tell single objects from arrays.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrackingAllocator;

#[cfg(feature = "track-allocs")]
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match global().try_allocate(AllocKind::Object, layout) {
            Ok(ptr) => ptr.as_ptr(),
            Err(MemoryError::OutOfMemory { .. }) => ptr::null_mut(),
            Err(err) => fatal(&err),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        // SAFETY: `GlobalAlloc` callers hand back pointers from `alloc` with
        // the same layout; anything else is refused without being read.
        if let Err(err) = unsafe { global().try_release(AllocKind::Object, ptr, layout) } {
            fatal(&err);
        }
    }
}

#[cfg(not(feature = "track-allocs"))]
unsafe impl GlobalAlloc for TrackingAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { System.alloc(layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { System.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { System.alloc_zeroed(layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

/// Reports a misuse of the global allocator and aborts.
///
/// Unwinding out of `GlobalAlloc` is undefined behavior and logging may
/// allocate, so the report goes straight to stderr with raw frame addresses.
#[cfg(feature = "track-allocs")]
#[cold]
fn fatal(err: &MemoryError) -> ! {
    use std::io::Write as _;

    let stack = StackTrace::capture(MAX_STACK_DEPTH);
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(out, "strata_alloc: fatal: {err}");
    for (i, ip) in stack.frames().iter().enumerate() {
        let _ = writeln!(out, "  #{i:<2} {ip:#018x}");
    }
    let _ = out.flush();
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_round_trip() {
        let layout = Layout::from_size_align(128, 32).unwrap();
        let ptr = unsafe { TrackingAllocator.alloc(layout) };
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 32, 0);
        unsafe {
            ptr.write_bytes(0xAB, 128);
            TrackingAllocator.dealloc(ptr, layout);
        }
    }

    #[test]
    fn test_dealloc_null_is_ignored() {
        unsafe { TrackingAllocator.dealloc(std::ptr::null_mut(), Layout::new::<u64>()) };
    }
}
