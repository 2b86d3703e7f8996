//! # Bucket Table
//!
//! Open-chaining engine behind [`BucketMap`](super::BucketMap) and
//! [`BucketSet`](super::BucketSet).
//!
//! ```text
//! buckets: [ ─ | ● | ─ | ● ]          (capacity = 4)
//!                ▼       ▼
//! arena:       e2 ──► e0  e1          (entries never move)
//! ```
//!
//! Entries live in a private [`SlotArena`] and are chained per bucket through
//! an intrusive link. Each entry caches its 64-bit hash, so growing or
//! trimming the bucket array only relinks entries; keys are never rehashed
//! and elements are never moved.

use std::borrow::Borrow;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::mem;
use std::slice;

use siphasher::sip::SipHasher13;

use crate::chain::{Chain, ChainIter, ChainLinks, ChainNode, NodeStore};
use crate::config::TableConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::memory::{SlotArena, SlotHandle};

/// Default hasher: `SipHash-1-3` with fixed keys, so bucket order is the same
/// on every run.
pub type DefaultHashBuilder = BuildHasherDefault<SipHasher13>;

/// An element stored in a table, exposing the key it is indexed by.
pub(crate) trait Keyed {
    type Key: Hash + Eq;

    fn key(&self) -> &Self::Key;
}

/// One arena slot: bucket link, cached hash, element.
pub(crate) struct Entry<E> {
    links: ChainLinks<SlotHandle>,
    hash: u64,
    element: E,
}

impl<E> ChainNode<SlotHandle> for Entry<E> {
    #[inline]
    fn next(&self, index: usize) -> Option<SlotHandle> {
        self.links.next(index)
    }

    #[inline]
    fn set_next(&mut self, index: usize, next: Option<SlotHandle>) {
        self.links.set_next(index, next);
    }
}

type Bucket = Chain<SlotHandle>;

/// Bucket array plus the arena owning its entries.
///
/// `buckets.len()` is the table capacity. Every live entry is linked into
/// exactly one bucket, `hash % capacity`.
pub(crate) struct BucketTable<E, S> {
    buckets: Vec<Bucket>,
    arena: SlotArena<Entry<E>>,
    hash_builder: S,
}

impl<E, S> BucketTable<E, S> {
    /// Empty table with `capacity` buckets and entry blocks of `block_slots`.
    pub(crate) fn with_parts(capacity: usize, block_slots: usize, hash_builder: S) -> Self {
        Self {
            buckets: empty_buckets(capacity),
            arena: SlotArena::with_block_slots(block_slots),
            hash_builder,
        }
    }

    /// Empty table sized by `config`.
    pub(crate) fn from_config(config: &TableConfig, hash_builder: S) -> Self {
        Self {
            buckets: empty_buckets(config.initial_buckets),
            arena: SlotArena::from_config(&config.arena()),
            hash_builder,
        }
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn load_factor(&self) -> f32 {
        if self.buckets.is_empty() {
            0.0
        } else {
            self.len() as f32 / self.capacity() as f32
        }
    }

    #[inline]
    pub(crate) const fn hasher(&self) -> &S {
        &self.hash_builder
    }

    #[inline]
    pub(crate) fn element(&self, id: SlotHandle) -> &E {
        &self.arena.node(id).element
    }

    #[inline]
    pub(crate) fn element_mut(&mut self, id: SlotHandle) -> &mut E {
        &mut self.arena.node_mut(id).element
    }

    /// Destroys every entry. Bucket array and arena blocks are kept for reuse.
    pub(crate) fn clear(&mut self) {
        if self.arena.is_empty() {
            return;
        }
        for bucket in &mut self.buckets {
            bucket.destroy_all(&mut self.arena);
        }
        debug_assert!(self.arena.is_empty());
    }

    /// Elements in bucket-then-chain order.
    pub(crate) fn iter(&self) -> Iter<'_, E> {
        Iter {
            arena: &self.arena,
            buckets: self.buckets.iter(),
            chain: None,
            remaining: self.len(),
        }
    }

    /// Elements in arena storage order.
    pub(crate) fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = &mut E> {
        let len = self.len();
        ExactLen {
            inner: self.arena.iter_mut().map(|(_, entry)| &mut entry.element),
            remaining: len,
        }
    }

    /// Makes room for `additional` more elements without growing on insert.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> MemoryResult<()> {
        let needed = self
            .len()
            .checked_add(additional)
            .ok_or(MemoryError::CapacityOverflow {
                requested: additional,
            })?;
        let capacity = self.capacity();
        if needed <= capacity {
            return Ok(());
        }

        let target = needed.max(capacity.saturating_add(capacity / 2));
        self.relink(try_empty_buckets(target)?);
        Ok(())
    }

    /// Same as [`try_reserve`](Self::try_reserve) but fatal on overflow.
    pub(crate) fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            panic!("{err}");
        }
    }

    /// Shrinks the bucket array to `len * 4 / 3` (rounded) if that is smaller.
    ///
    /// An empty table drops its bucket array and releases its arena blocks.
    pub(crate) fn trim(&mut self) {
        let target = (self.len().saturating_mul(4) + 2) / 3;
        if target >= self.capacity() {
            return;
        }
        if target == 0 {
            self.buckets = Vec::new();
            self.arena.free();
            tracing::debug!("bucket table trimmed to zero, arena released");
            return;
        }
        self.relink(empty_buckets(target));
    }

    /// Moves every entry into `buckets` using its cached hash.
    fn relink(&mut self, buckets: Vec<Bucket>) {
        let capacity = buckets.len();
        let old = mem::replace(&mut self.buckets, buckets);
        let old_capacity = old.len();

        for mut bucket in old {
            while let Some(id) = bucket.pop_first(&mut self.arena) {
                let index = bucket_index(self.arena.node(id).hash, capacity);
                self.buckets[index].push_first(&mut self.arena, id);
            }
        }

        tracing::debug!(
            from = old_capacity,
            to = capacity,
            len = self.len(),
            "bucket table rehashed"
        );
    }
}

impl<E: Keyed, S: BuildHasher> BucketTable<E, S> {
    /// Entry holding `key`, if any.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<SlotHandle>
    where
        E::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_hashed(self.hash_builder.hash_one(key), key)
    }

    /// Inserts `element` unless its key is present.
    ///
    /// With `overwrite` an existing element is replaced, otherwise it is kept
    /// and `element` is dropped. Returns the live entry and whether it is new.
    pub(crate) fn insert(&mut self, element: E, overwrite: bool) -> (SlotHandle, bool) {
        let hash = self.hash_builder.hash_one(element.key());

        if let Some(id) = self.find_hashed(hash, element.key()) {
            if overwrite {
                self.arena.node_mut(id).element = element;
            }
            return (id, false);
        }

        self.reserve(1);
        let index = bucket_index(hash, self.capacity());
        let id = self.arena.allocate(Entry {
            links: ChainLinks::new(),
            hash,
            element,
        });
        self.buckets[index].push_first(&mut self.arena, id);
        (id, true)
    }

    /// Unlinks and returns the element holding `key`.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<E>
    where
        E::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.hash_builder.hash_one(key);
        let index = bucket_index(hash, self.capacity());

        let mut prev = None;
        let mut current = self.buckets[index].first();
        while let Some(id) = current {
            let entry = self.arena.node(id);
            if entry.hash == hash && entry.element.key().borrow() == key {
                self.buckets[index].erase_after(&mut self.arena, id, prev);
                return Some(self.arena.deallocate(id).element);
            }
            prev = current;
            current = entry.links.next(0);
        }
        None
    }

    /// Same length and every element of `self` has a match in `other`
    /// under `eq`. Bucket layout is irrelevant.
    pub(crate) fn matches<T, F>(&self, other: &BucketTable<E, T>, eq: F) -> bool
    where
        T: BuildHasher,
        F: Fn(&E, &E) -> bool,
    {
        self.len() == other.len()
            && self
                .iter()
                .all(|element| other.find(element.key()).is_some_and(|id| eq(element, other.element(id))))
    }

    fn find_hashed<Q>(&self, hash: u64, key: &Q) -> Option<SlotHandle>
    where
        E::Key: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let bucket = &self.buckets[bucket_index(hash, self.capacity())];
        bucket
            .iter(&self.arena)
            .find(|(_, entry)| entry.hash == hash && entry.element.key().borrow() == key)
            .map(|(id, _)| id)
    }
}

impl<E: Clone, S: Clone> Clone for BucketTable<E, S> {
    /// Rebuilds the table entry by entry, keeping bucket layout and order.
    fn clone(&self) -> Self {
        let mut table = Self::with_parts(
            self.capacity(),
            self.arena.block_slots(),
            self.hash_builder.clone(),
        );

        for (index, bucket) in self.buckets.iter().enumerate() {
            let mut tail = None;
            for (_, entry) in bucket.iter(&self.arena) {
                let id = table.arena.allocate(Entry {
                    links: ChainLinks::new(),
                    hash: entry.hash,
                    element: entry.element.clone(),
                });
                match tail {
                    None => table.buckets[index].push_first(&mut table.arena, id),
                    Some(prev) => table.buckets[index].insert_after(&mut table.arena, id, prev),
                }
                tail = Some(id);
            }
        }
        table
    }
}

impl<E, S> Drop for BucketTable<E, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn bucket_index(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

fn try_empty_buckets(capacity: usize) -> MemoryResult<Vec<Bucket>> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| MemoryError::CapacityOverflow {
            requested: capacity,
        })?;
    buckets.resize_with(capacity, Bucket::new);
    Ok(buckets)
}

/// Bucket array of `capacity` empty chains.
///
/// # Panics
///
/// Panics with [`MemoryError::CapacityOverflow`] if the array cannot be allocated.
fn empty_buckets(capacity: usize) -> Vec<Bucket> {
    match try_empty_buckets(capacity) {
        Ok(buckets) => buckets,
        Err(err) => panic!("{err}"),
    }
}

/// Borrowing iterator in bucket-then-chain order.
pub(crate) struct Iter<'a, E> {
    arena: &'a SlotArena<Entry<E>>,
    buckets: slice::Iter<'a, Bucket>,
    chain: Option<ChainIter<'a, SlotHandle, SlotArena<Entry<E>>, 0>>,
    remaining: usize,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, entry)) = self.chain.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some(&entry.element);
            }
            let bucket = self.buckets.next()?;
            self.chain = Some(bucket.iter(self.arena));
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

/// Attaches a known length to an iterator that cannot report one itself.
struct ExactLen<I> {
    inner: I,
    remaining: usize,
}

impl<I: Iterator> Iterator for ExactLen<I> {
    type Item = I::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<I: Iterator> ExactSizeIterator for ExactLen<I> {}
