//! Bucket map and set behavior across rehashes, trims and random edits.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_core::{BucketMap, BucketSet, MemoryConfig, MemoryError};

#[test]
fn test_abc_scenario() {
    let mut map: BucketMap<String, i32> = BucketMap::new();
    for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
        map.add(key.to_owned(), value);
    }

    assert_eq!(map.find("b"), Some(&2));
    assert!(map.erase("a"));
    assert_eq!(map.find("a"), None);
    assert_eq!(map.len(), 2);
}

#[test]
fn test_rehash_keeps_every_key() {
    let mut map: BucketMap<u64, u64> = BucketMap::new();
    let mut capacities = Vec::new();

    for key in 0..5_000u64 {
        map.add(key, key * 3);
        if capacities.last() != Some(&map.capacity()) {
            capacities.push(map.capacity());
        }
        assert_eq!(map.len() as u64, key + 1);
    }

    assert!(capacities.len() > 10, "expected many rehashes, got {capacities:?}");
    assert!(map.load_factor() <= 1.0);
    for key in 0..5_000u64 {
        assert_eq!(map.find(&key), Some(&(key * 3)));
    }
}

#[test]
fn test_random_ops_match_std_map() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut map: BucketMap<u32, u32> = BucketMap::new();
    let mut model: HashMap<u32, u32> = HashMap::new();

    for _ in 0..20_000 {
        let key = rng.gen_range(0..512);
        let value = rng.gen();
        match rng.gen_range(0..4) {
            0 => {
                map.add(key, value);
                model.insert(key, value);
            }
            1 => {
                let inserted = map.insert(key, value, false);
                assert_eq!(inserted, !model.contains_key(&key));
                model.entry(key).or_insert(value);
            }
            2 => {
                assert_eq!(map.remove(&key), model.remove(&key));
            }
            _ => {
                assert_eq!(map.find(&key), model.get(&key));
            }
        }
        assert_eq!(map.len(), model.len());
    }

    let mut entries: Vec<(u32, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    let mut expected: Vec<(u32, u32)> = model.into_iter().collect();
    entries.sort_unstable();
    expected.sort_unstable();
    assert_eq!(entries, expected);
}

#[test]
fn test_equality_independent_of_insertion_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut pairs: Vec<(String, usize)> = (0..300).map(|i| (format!("key-{i}"), i)).collect();

    let first: BucketMap<String, usize> = pairs.iter().cloned().collect();
    for i in (1..pairs.len()).rev() {
        let j = rng.gen_range(0..=i);
        pairs.swap(i, j);
    }
    let mut second: BucketMap<String, usize> = BucketMap::with_capacity(1_000);
    second.extend(pairs.iter().cloned());

    assert_ne!(first.capacity(), second.capacity());
    assert_eq!(first, second);
    assert_eq!(first.clone(), second);
}

#[test]
fn test_trim_after_mass_erase() {
    let mut set: BucketSet<u32> = (0..1_000).collect();
    let grown = set.capacity();
    for key in 10..1_000 {
        assert!(set.erase(&key));
    }

    set.trim();
    assert_eq!(set.capacity(), 14);
    assert!(set.capacity() < grown);
    for key in 0..10 {
        assert!(set.contains(&key));
    }

    for key in 0..10 {
        set.erase(&key);
    }
    set.trim();
    assert_eq!(set.capacity(), 0);
    assert!(set.is_empty());
}

#[test]
fn test_config_driven_tables() {
    let config = MemoryConfig::from_toml_str(
        r#"
        [table]
        initial_buckets = 32
        block_slots = 16
        "#,
    )
    .unwrap();

    let mut map: BucketMap<u16, u16> = BucketMap::from_config(&config.table);
    assert_eq!(map.capacity(), 32);
    map.extend((0..20).map(|i| (i, i)));
    assert_eq!(map.capacity(), 32);
    assert_eq!(map.arena_capacity(), 32);

    let err = map.try_reserve(usize::MAX).unwrap_err();
    assert!(matches!(err, MemoryError::CapacityOverflow { .. }));
}

#[test]
#[should_panic(expected = "capacity overflow")]
fn test_reserve_overflow_is_fatal() {
    let mut set: BucketSet<u8> = BucketSet::new();
    set.add(1);
    set.reserve(usize::MAX);
}
