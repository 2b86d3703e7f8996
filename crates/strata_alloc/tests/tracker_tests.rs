//! Tracker integration tests: counter conservation, misuse detection and
//! leak reporting.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_alloc::{AllocKind, AllocTracker, MemoryError, TrackerConfig};

fn tracker() -> AllocTracker {
    AllocTracker::new(TrackerConfig::debug())
}

#[test]
fn test_counters_conserved_under_random_traffic() {
    let tracker = AllocTracker::new(TrackerConfig::production());
    let mut rng = ChaCha8Rng::seed_from_u64(0xA110C);
    let mut live: Vec<(NonNull<u8>, Layout, AllocKind)> = Vec::new();
    let mut allocated = 0u64;

    for _ in 0..2_000 {
        if live.is_empty() || rng.gen_bool(0.55) {
            let size = rng.gen_range(0..512);
            let align = 1 << rng.gen_range(0..7);
            let layout = Layout::from_size_align(size, align).unwrap();
            let kind = if rng.gen_bool(0.5) {
                AllocKind::Object
            } else {
                AllocKind::Array
            };
            let ptr = tracker.allocate(kind, layout);
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            live.push((ptr, layout, kind));
            allocated += size as u64;
        } else {
            let index = rng.gen_range(0..live.len());
            let (ptr, layout, kind) = live.swap_remove(index);
            unsafe { tracker.release(kind, ptr, layout) };
        }

        let stats = tracker.stats();
        assert_eq!(stats.current_count, live.len());
        assert_eq!(
            stats.current_amount,
            live.iter().map(|(_, layout, _)| layout.size()).sum::<usize>()
        );
        assert!(stats.max_count >= stats.current_count);
        assert!(stats.max_amount >= stats.current_amount);
        assert_eq!(stats.cumulative_amount, allocated);
    }

    let objects = tracker.live(AllocKind::Object).len();
    let arrays = tracker.live(AllocKind::Array).len();
    assert_eq!(objects + arrays, live.len());

    for (ptr, layout, kind) in live.drain(..) {
        unsafe { tracker.release(kind, ptr, layout) };
    }
    let stats = tracker.stats();
    assert_eq!(stats.current_count, 0);
    assert_eq!(stats.current_amount, 0);
}

#[test]
fn test_allocate_then_release_object() {
    let tracker = tracker();
    let layout = Layout::from_size_align(32, 8).unwrap();

    let ptr = tracker.allocate(AllocKind::Object, layout);
    let stats = tracker.stats();
    assert_eq!(stats.current_count, 1);
    assert_eq!(stats.current_amount, 32);

    let live = tracker.live(AllocKind::Object);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].address, ptr.as_ptr() as usize);
    assert_eq!(live[0].size, 32);

    unsafe { tracker.release(AllocKind::Object, ptr, layout) };
    let stats = tracker.stats();
    assert_eq!(stats.current_count, 0);
    assert_eq!(stats.current_amount, 0);
    assert_eq!(stats.cumulative_count, 1);
    assert_eq!(stats.max_amount, 32);
}

#[test]
fn test_foreign_pointer_is_unregistered() {
    let tracker = tracker();
    let layout = Layout::new::<[u8; 16]>();
    let mut buffer = [0u8; 256];
    let foreign = NonNull::new(buffer.as_mut_ptr().wrapping_add(128)).unwrap();

    let err = unsafe { tracker.try_release(AllocKind::Object, foreign, layout) }.unwrap_err();
    assert!(matches!(
        err,
        MemoryError::Unregistered {
            size: 16,
            kind: AllocKind::Object,
            ..
        }
    ));
    assert_eq!(buffer, [0u8; 256]);
    assert_eq!(tracker.stats().current_count, 0);
}

#[test]
fn test_double_release_is_unregistered() {
    let tracker = tracker();
    let layout = Layout::new::<u64>();
    let keep = tracker.allocate(AllocKind::Array, layout);
    let ptr = tracker.allocate(AllocKind::Array, layout);
    unsafe { tracker.release(AllocKind::Array, ptr, layout) };

    let err = unsafe { tracker.try_release(AllocKind::Array, ptr, layout) }.unwrap_err();
    assert!(matches!(err, MemoryError::Unregistered { .. }));
    assert_eq!(tracker.stats().current_count, 1);

    unsafe { tracker.release(AllocKind::Array, keep, layout) };
}

#[test]
#[should_panic(expected = "releasing unregistered")]
fn test_release_unregistered_panics() {
    let tracker = tracker();
    let mut slot = 0u64;
    let ptr = NonNull::from(&mut slot).cast::<u8>();
    unsafe { tracker.release(AllocKind::Object, ptr, Layout::new::<u64>()) };
}

#[test]
#[should_panic(expected = "mismatch")]
fn test_release_wrong_kind_panics() {
    let tracker = tracker();
    let layout = Layout::new::<[u16; 10]>();
    let ptr = tracker.allocate(AllocKind::Array, layout);
    unsafe { tracker.release(AllocKind::Object, ptr, layout) };
}

#[test]
fn test_over_aligned_payload() {
    let tracker = tracker();
    let layout = Layout::from_size_align(100, 64).unwrap();
    let ptr = tracker.allocate(AllocKind::Array, layout);
    assert_eq!(ptr.as_ptr() as usize % 64, 0);

    unsafe {
        ptr.as_ptr().write_bytes(0x5A, 100);
        assert_eq!(*ptr.as_ptr().add(99), 0x5A);
        tracker.release(AllocKind::Array, ptr, layout);
    }
}

#[test]
fn test_zero_sized_allocation() {
    let tracker = tracker();
    let layout = Layout::from_size_align(0, 1).unwrap();
    let first = tracker.allocate(AllocKind::Object, layout);
    let second = tracker.allocate(AllocKind::Object, layout);
    assert_ne!(first, second);
    assert_eq!(tracker.stats().current_count, 2);
    assert_eq!(tracker.stats().current_amount, 0);

    unsafe {
        tracker.release(AllocKind::Object, first, layout);
        tracker.release(AllocKind::Object, second, layout);
    }
}

#[test]
fn test_report_leaks() {
    let tracker = tracker();
    assert!(!tracker.report_leaks());

    let layout = Layout::new::<[u8; 48]>();
    let ptr = tracker.allocate(AllocKind::Object, layout);
    assert!(tracker.report_leaks());
    tracker.log_summary();

    unsafe { tracker.release(AllocKind::Object, ptr, layout) };
    assert!(!tracker.report_leaks());
}

#[test]
fn test_config_from_toml_drives_tracker() {
    let config = TrackerConfig::from_toml_str("capture_stacks = false\npoison = true\n").unwrap();
    let tracker = AllocTracker::new(config);
    let layout = Layout::new::<u32>();
    let ptr = tracker.allocate(AllocKind::Object, layout);
    assert!(tracker.live(AllocKind::Object)[0].stack.is_empty());
    unsafe { tracker.release(AllocKind::Object, ptr, layout) };
}
