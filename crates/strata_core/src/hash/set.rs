//! Key set over a [`BucketTable`](super::table::BucketTable).

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use super::table::{self, BucketTable, DefaultHashBuilder, Keyed};
use crate::config::{TableConfig, DEFAULT_BLOCK_SLOTS};
use crate::error::MemoryResult;

#[derive(Clone)]
pub(crate) struct Member<K>(K);

impl<K: Hash + Eq> Keyed for Member<K> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.0
    }
}

/// Open-chaining hash set with arena-allocated entries.
pub struct BucketSet<K, S = DefaultHashBuilder> {
    table: BucketTable<Member<K>, S>,
}

impl<K> BucketSet<K, DefaultHashBuilder> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty set with `capacity` buckets.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }

    /// Creates an empty set sized by `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.block_slots` is out of range.
    #[must_use]
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            table: BucketTable::from_config(config, DefaultHashBuilder::default()),
        }
    }
}

impl<K, S> BucketSet<K, S> {
    /// Creates an empty set using `hash_builder`.
    #[must_use]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty set with `capacity` buckets using `hash_builder`.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: BucketTable::with_parts(capacity, DEFAULT_BLOCK_SLOTS, hash_builder),
        }
    }

    /// Number of keys.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.len()
    }

    /// True iff the set is empty.
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

    /// Grows the bucket array so `additional` more keys fit without a rehash.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity cannot be represented.
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
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Removes every key, keeping allocated storage.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates over keys in bucket order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<K, S> BucketSet<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Stored key equal to `key`.
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.table.find(key)?;
        Some(&self.table.element(id).0)
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

    /// Inserts `key`, replacing an equal stored key. True iff it was absent.
    pub fn add(&mut self, key: K) -> bool {
        self.table.insert(Member(key), true).1
    }

    /// Inserts `key` only if absent. True iff it was absent.
    pub fn include(&mut self, key: K) -> bool {
        self.table.insert(Member(key), false).1
    }

    /// Removes `key`. Returns whether it was present.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key).is_some()
    }

    /// Removes and returns the stored key equal to `key`.
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key).map(|member| member.0)
    }
}

impl<K> Default for BucketSet<K, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, S: BuildHasher> PartialEq for BucketSet<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.table.matches(&other.table, |_, _| true)
    }
}

impl<K: Hash + Eq, S: BuildHasher> Eq for BucketSet<K, S> {}

impl<K: Clone, S: Clone> Clone for BucketSet<K, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K: fmt::Debug, S> fmt::Debug for BucketSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Hash + Eq, S: BuildHasher> Extend<K> for BucketSet<K, S> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for key in iter {
            self.add(key);
        }
    }
}

impl<K: Hash + Eq, S: BuildHasher + Default> FromIterator<K> for BucketSet<K, S> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<'a, K, S> IntoIterator for &'a BucketSet<K, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`BucketSet`] in bucket order.
pub struct Iter<'a, K> {
    inner: table::Iter<'a, Member<K>>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|member| &member.0)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_include_erase() {
        let mut set: BucketSet<String> = BucketSet::new();
        assert!(set.add("x".to_owned()));
        assert!(!set.add("x".to_owned()));
        assert!(!set.include("x".to_owned()));
        assert!(set.include("y".to_owned()));
        assert_eq!(set.len(), 2);

        assert!(set.contains("y"));
        assert_eq!(set.find("x").map(String::as_str), Some("x"));
        assert!(set.erase("x"));
        assert!(!set.erase("x"));
        assert_eq!(set.take("y"), Some("y".to_owned()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_equality_ignores_order() {
        let forward: BucketSet<u16> = (0..50).collect();
        let backward: BucketSet<u16> = (0..50).rev().collect();
        assert_eq!(forward, backward);

        let mut shorter = backward.clone();
        shorter.erase(&0);
        assert_ne!(forward, shorter);
    }

    #[test]
    fn test_clear_then_trim() {
        let mut set: BucketSet<u8> = (0..=255).collect();
        assert_eq!(set.iter().count(), 256);
        set.clear();
        assert!(set.is_empty());
        assert!(set.capacity() > 0);
        set.trim();
        assert_eq!(set.capacity(), 0);
        assert!(set.add(1));
    }

    #[test]
    fn test_debug_and_into_iter() {
        let mut set: BucketSet<i32> = BucketSet::with_capacity(4);
        set.add(5);
        assert_eq!(format!("{set:?}"), "{5}");
        let sum: i32 = (&set).into_iter().sum();
        assert_eq!(sum, 5);
    }
}
