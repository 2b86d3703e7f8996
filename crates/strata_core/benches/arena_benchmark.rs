//! # Slot Arena Benchmark
//!
//! Allocation churn through the free-list versus fresh block growth.
//!
//! Run with: `cargo bench --package strata_core --bench arena_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::{SlotArena, SlotHandle};

/// Fill an empty arena, growing it block by block.
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_fill");

    for block_slots in [16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_slots),
            &block_slots,
            |b, &block_slots| {
                b.iter(|| {
                    let mut arena: SlotArena<[u64; 4]> = SlotArena::with_block_slots(block_slots);
                    let handles: Vec<SlotHandle> =
                        (0..65_536u64).map(|i| arena.allocate([i; 4])).collect();
                    for handle in handles {
                        black_box(arena.deallocate(handle));
                    }
                    arena.block_count()
                });
            },
        );
    }

    group.finish();
}

/// Steady-state allocate/deallocate on a warm arena; no block growth.
fn bench_churn(c: &mut Criterion) {
    let mut arena: SlotArena<u64> = SlotArena::with_block_slots(1024);
    let warm: Vec<SlotHandle> = (0..1024).map(|i| arena.allocate(i)).collect();
    for handle in warm {
        arena.deallocate(handle);
    }

    c.bench_function("arena_churn_1k", |b| {
        b.iter(|| {
            let handles: Vec<SlotHandle> = (0..1024).map(|i| arena.allocate(i)).collect();
            for handle in handles.into_iter().rev() {
                black_box(arena.deallocate(handle));
            }
        });
    });
}

criterion_group!(benches, bench_fill, bench_churn);
criterion_main!(benches);
