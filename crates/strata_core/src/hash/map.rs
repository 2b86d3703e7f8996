//! Key-value map over a [`BucketTable`](super::table::BucketTable).

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use super::table::{self, BucketTable, DefaultHashBuilder, Keyed};
use crate::config::{TableConfig, DEFAULT_BLOCK_SLOTS};
use crate::error::MemoryResult;

#[derive(Clone)]
pub(crate) struct Pair<K, V> {
    key: K,
    value: V,
}

impl<K: Hash + Eq, V> Keyed for Pair<K, V> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }
}

/// Open-chaining hash map with arena-allocated entries.
///
/// Entries never move once inserted: growing the bucket array relinks them
/// using their cached hash. Iteration follows bucket order, which is
/// unrelated to insertion order.
///
/// # Example
///
/// ```rust
/// use strata_core::BucketMap;
///
/// let mut scores: BucketMap<String, u32> = BucketMap::new();
/// scores.add("a".to_owned(), 1);
/// scores.add("b".to_owned(), 2);
///
/// assert_eq!(scores.find("b"), Some(&2));
/// assert!(scores.erase("a"));
/// assert_eq!(scores.find("a"), None);
/// ```
pub struct BucketMap<K, V, S = DefaultHashBuilder> {
    table: BucketTable<Pair<K, V>, S>,
}

impl<K, V> BucketMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map. Nothing is allocated until the first insert.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty map with `capacity` buckets.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }

    /// Creates an empty map sized by `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.block_slots` is out of range; validate the config
    /// first when it comes from a file.
    #[must_use]
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            table: BucketTable::from_config(config, DefaultHashBuilder::default()),
        }
    }
}

impl<K, V, S> BucketMap<K, V, S> {
    /// Creates an empty map using `hash_builder`.
    #[must_use]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty map with `capacity` buckets using `hash_builder`.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: BucketTable::with_parts(capacity, DEFAULT_BLOCK_SLOTS, hash_builder),
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.len()
    }

    /// True iff the map has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Length of the bucket array.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Entry slots allocated in the backing arena.
    #[inline]
    #[must_use]
    pub fn arena_capacity(&self) -> usize {
        self.table.arena_capacity()
    }

    /// Entries per bucket, 0.0 for a map without buckets.
    #[inline]
    #[must_use]
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// The map's hash builder.
    #[inline]
    #[must_use]
    pub const fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Grows the bucket array so `additional` more entries fit without a rehash.
    ///
    /// # Panics
    ///
    /// Panics with [`MemoryError::CapacityOverflow`](crate::MemoryError::CapacityOverflow)
    /// if the new capacity cannot be represented.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible [`reserve`](Self::reserve).
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::CapacityOverflow`](crate::MemoryError::CapacityOverflow)
    /// if the new capacity cannot be represented or allocated.
    pub fn try_reserve(&mut self, additional: usize) -> MemoryResult<()> {
        self.table.try_reserve(additional)
    }

    /// Shrinks the bucket array to about `len * 4 / 3`.
    ///
    /// An empty map also releases its entry arena.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Removes every entry, keeping allocated storage.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates over `(key, value)` pairs in bucket order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Iterates over keys in bucket order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over values in bucket order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Iterates mutably over values in arena order.
    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> {
        self.table.iter_mut().map(|pair| &mut pair.value)
    }

    /// Iterates over `(key, mutable value)` pairs in arena order.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (&K, &mut V)> {
        self.table
            .iter_mut()
            .map(|pair| (&pair.key, &mut pair.value))
    }
}

impl<K, V, S> BucketMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Value stored under `key`.
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.table.find(key)?;
        Some(&self.table.element(id).value)
    }

    /// Mutable value stored under `key`.
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.table.find(key)?;
        Some(&mut self.table.element_mut(id).value)
    }

    /// Stored key and value for `key`.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.table.find(key)?;
        let pair = self.table.element(id);
        Some((&pair.key, &pair.value))
    }

    /// True iff `key` is present.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).is_some()
    }

    /// Inserts or overwrites, returning the stored value.
    pub fn add(&mut self, key: K, value: V) -> &mut V {
        let (id, _) = self.table.insert(Pair { key, value }, true);
        &mut self.table.element_mut(id).value
    }

    /// Inserts only if `key` is absent, returning the value now stored.
    ///
    /// An existing value is left untouched and `value` is dropped.
    pub fn include(&mut self, key: K, value: V) -> &mut V {
        let (id, _) = self.table.insert(Pair { key, value }, false);
        &mut self.table.element_mut(id).value
    }

    /// Inserts `key -> value`, overwriting an existing value only if
    /// `overwrite` is set. Returns true iff `key` was not present before.
    pub fn insert(&mut self, key: K, value: V, overwrite: bool) -> bool {
        self.table.insert(Pair { key, value }, overwrite).1
    }

    /// Removes `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key).map(|pair| pair.value)
    }

    /// Removes `key`. Returns whether it was present.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key).is_some()
    }
}

impl<K, V> Default for BucketMap<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> PartialEq for BucketMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    /// Same entries, regardless of capacity or bucket order.
    fn eq(&self, other: &Self) -> bool {
        self.table.matches(&other.table, |a, b| a.value == b.value)
    }
}

impl<K, V, S> Eq for BucketMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K: Clone, V: Clone, S: Clone> Clone for BucketMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for BucketMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for BucketMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for BucketMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a BucketMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`BucketMap`] in bucket order.
pub struct Iter<'a, K, V> {
    inner: table::Iter<'a, Pair<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pair| (&pair.key, &pair.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
