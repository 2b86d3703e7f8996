//! # Singly-Linked Chain
//!
//! A non-owning list threaded through link field `INDEX` of caller-owned
//! nodes. Only the head id is stored; position-based operations take the
//! predecessor as an argument instead of searching for it.

use std::fmt;

use super::node::{ChainNode, NodeRelease, NodeStore};

/// Singly-linked intrusive list.
///
/// # Complexity
///
/// | Operation | Cost |
/// |-----------|------|
/// | `add` / `push_first` / `pop_first` | O(1) |
/// | `insert_after` / `erase_after` | O(1) given the predecessor |
/// | `len` / `last` / `before` / `has` / `contains` | O(n) |
///
/// # Example
///
/// ```rust
/// use strata_core::chain::{Chain, ChainLinks, ChainNode};
///
/// struct Item {
///     value: u32,
///     links: ChainLinks<usize>,
/// }
///
/// impl ChainNode<usize> for Item {
///     fn next(&self, index: usize) -> Option<usize> {
///         self.links.next(index)
///     }
///     fn set_next(&mut self, index: usize, next: Option<usize>) {
///         self.links.set_next(index, next);
///     }
/// }
///
/// let mut items: Vec<Item> = (0..3)
///     .map(|value| Item { value, links: ChainLinks::new() })
///     .collect();
///
/// let mut chain: Chain<usize> = Chain::new();
/// chain.add(&mut items, 0);
/// chain.add(&mut items, 2);
///
/// let values: Vec<u32> = chain.iter(&items).map(|(_, item)| item.value).collect();
/// assert_eq!(values, vec![2, 0]);
/// ```
pub struct Chain<Id, const INDEX: usize = 0> {
    first: Option<Id>,
}

impl<Id: Copy + Eq, const INDEX: usize> Chain<Id, INDEX> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { first: None }
    }

    /// First node, if any.
    #[inline]
    #[must_use]
    pub const fn first(&self) -> Option<Id> {
        self.first
    }

    /// True iff the chain has no nodes.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Number of nodes. O(n).
    #[must_use]
    pub fn len<S>(&self, store: &S) -> usize
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        self.iter(store).count()
    }

    /// Last node. O(n).
    #[must_use]
    pub fn last<S>(&self, store: &S) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        self.iter(store).last().map(|(id, _)| id)
    }

    /// Predecessor of `id`, or `None` if `id` is the first node. O(n).
    ///
    /// `id` must be in the chain.
    #[must_use]
    pub fn before<S>(&self, store: &S, id: Id) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        let mut before = None;
        let mut current = self.first;
        while let Some(node) = current {
            if node == id {
                return before;
            }
            before = current;
            current = store.node(node).next(INDEX);
        }
        None
    }

    /// True iff the node `id` itself is linked into this chain. O(n).
    #[must_use]
    pub fn has<S>(&self, store: &S, id: Id) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        self.iter(store).any(|(node, _)| node == id)
    }

    /// True iff some node in the chain equals `element`. O(n).
    #[must_use]
    pub fn contains<S>(&self, store: &S, element: &S::Node) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id> + PartialEq,
    {
        self.iter(store).any(|(_, node)| node == element)
    }

    /// Pushes `id` to the front. Same as [`push_first`](Self::push_first).
    #[inline]
    pub fn add<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        self.push_first(store, id);
    }

    /// Pushes `id` to the front.
    #[inline]
    pub fn push_first<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        store.node_mut(id).set_next(INDEX, self.first);
        self.first = Some(id);
    }

    /// Unlinks and returns the first node.
    #[inline]
    pub fn pop_first<S>(&mut self, store: &mut S) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        let id = self.first?;
        let node = store.node_mut(id);
        self.first = node.next(INDEX);
        node.set_next(INDEX, None);
        Some(id)
    }

    /// Links `id` right after `prev`, which must be in the chain.
    #[inline]
    pub fn insert_after<S>(&mut self, store: &mut S, id: Id, prev: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        debug_assert!(id != prev);
        let next = store.node(prev).next(INDEX);
        store.node_mut(id).set_next(INDEX, next);
        store.node_mut(prev).set_next(INDEX, Some(id));
    }

    /// Unlinks `id` given its predecessor (`None` when `id` is first).
    #[inline]
    pub fn erase_after<S>(&mut self, store: &mut S, id: Id, prev: Option<Id>)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        let next = store.node(id).next(INDEX);
        match prev {
            None => {
                debug_assert!(self.first == Some(id), "erased node is not first");
                self.first = next;
            }
            Some(prev) => {
                debug_assert!(
                    store.node(prev).next(INDEX) == Some(id),
                    "predecessor does not link to erased node"
                );
                store.node_mut(prev).set_next(INDEX, next);
            }
        }
        store.node_mut(id).set_next(INDEX, None);
    }

    /// Forgets all nodes without touching them.
    #[inline]
    pub fn clear(&mut self) {
        self.first = None;
    }

    /// Destroys every node through the store and empties the chain.
    ///
    /// The chain must be the nodes' only owner.
    pub fn destroy_all<S>(&mut self, store: &mut S)
    where
        S: NodeRelease<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        let mut current = self.first.take();
        while let Some(id) = current {
            current = store.node(id).next(INDEX);
            store.release(id);
        }
    }

    /// Element-wise comparison with another chain, possibly over another store.
    #[must_use]
    pub fn equals<S, T>(&self, store: &S, other: &Chain<Id, INDEX>, other_store: &T) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        T: NodeStore<Id, Node = S::Node> + ?Sized,
        S::Node: ChainNode<Id> + PartialEq,
    {
        let mut left = self.iter(store);
        let mut right = other.iter(other_store);
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some((_, a)), Some((_, b))) if a == b => {}
                _ => return false,
            }
        }
    }

    /// Iterates over `(id, node)` pairs from first to last.
    #[inline]
    pub fn iter<'a, S>(&self, store: &'a S) -> ChainIter<'a, Id, S, INDEX>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: ChainNode<Id>,
    {
        ChainIter {
            store,
            current: self.first,
        }
    }
}

impl<Id: Copy + Eq, const INDEX: usize> Default for Chain<Id, INDEX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: fmt::Debug, const INDEX: usize> fmt::Debug for Chain<Id, INDEX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("index", &INDEX)
            .field("first", &self.first)
            .finish()
    }
}

/// Forward iterator over a [`Chain`] or [`DChain`](super::DChain).
pub struct ChainIter<'a, Id, S: ?Sized, const INDEX: usize> {
    pub(super) store: &'a S,
    pub(super) current: Option<Id>,
}

impl<'a, Id, S, const INDEX: usize> Iterator for ChainIter<'a, Id, S, INDEX>
where
    Id: Copy,
    S: NodeStore<Id> + ?Sized,
    S::Node: ChainNode<Id> + 'a,
{
    type Item = (Id, &'a S::Node);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.store.node(id);
        self.current = node.next(INDEX);
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainLinks;

    #[derive(Debug)]
    struct Item {
        value: i32,
        links: ChainLinks<usize, 2>,
    }

    impl PartialEq for Item {
        fn eq(&self, other: &Self) -> bool {
            self.value == other.value
        }
    }

    impl ChainNode<usize> for Item {
        fn next(&self, index: usize) -> Option<usize> {
            self.links.next(index)
        }
        fn set_next(&mut self, index: usize, next: Option<usize>) {
            self.links.set_next(index, next);
        }
    }

    fn items(n: i32) -> Vec<Item> {
        (0..n)
            .map(|value| Item {
                value,
                links: ChainLinks::new(),
            })
            .collect()
    }

    fn values(chain: &Chain<usize>, store: &[Item]) -> Vec<i32> {
        chain.iter(store).map(|(_, item)| item.value).collect()
    }

    #[test]
    fn test_add_is_lifo() {
        let mut store = items(3);
        let mut chain: Chain<usize> = Chain::new();
        for id in 0..3 {
            chain.add(&mut store, id);
        }
        assert_eq!(values(&chain, &store), vec![2, 1, 0]);
        assert_eq!(chain.len(&store), 3);
        assert_eq!(chain.last(&store), Some(0));
        assert_eq!(chain.before(&store, 0), Some(1));
        assert_eq!(chain.before(&store, 2), None);
    }

    #[test]
    fn test_insert_and_erase_after() {
        let mut store = items(4);
        let mut chain: Chain<usize> = Chain::new();
        chain.add(&mut store, 0);
        chain.insert_after(&mut store, 1, 0);
        chain.insert_after(&mut store, 2, 1);
        assert_eq!(values(&chain, &store), vec![0, 1, 2]);

        chain.erase_after(&mut store, 1, Some(0));
        assert_eq!(values(&chain, &store), vec![0, 2]);

        chain.erase_after(&mut store, 0, None);
        assert_eq!(values(&chain, &store), vec![2]);
        assert!(!chain.has(&store, 0));
        assert!(chain.has(&store, 2));
    }

    #[test]
    fn test_pop_first() {
        let mut store = items(2);
        let mut chain: Chain<usize> = Chain::new();
        assert_eq!(chain.pop_first(&mut store), None);
        chain.add(&mut store, 0);
        chain.add(&mut store, 1);
        assert_eq!(chain.pop_first(&mut store), Some(1));
        assert_eq!(chain.pop_first(&mut store), Some(0));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_contains_by_value() {
        let mut store = items(3);
        let mut chain: Chain<usize> = Chain::new();
        chain.add(&mut store, 1);
        let needle = Item {
            value: 1,
            links: ChainLinks::new(),
        };
        assert!(chain.contains(&store, &needle));
        assert!(!chain.contains(&store, &store[2]));
    }

    #[test]
    fn test_node_in_two_chains() {
        let mut store = items(4);
        let mut evens: Chain<usize, 0> = Chain::new();
        let mut all: Chain<usize, 1> = Chain::new();
        for id in 0..4 {
            all.add(&mut store, id);
            if id % 2 == 0 {
                evens.add(&mut store, id);
            }
        }
        assert_eq!(evens.len(&store), 2);
        assert_eq!(all.len(&store), 4);

        all.clear();
        assert!(all.is_empty());
        assert_eq!(evens.len(&store), 2);
    }

    #[test]
    fn test_equals_across_stores() {
        let mut a = items(3);
        let mut b = items(3);
        let mut left: Chain<usize> = Chain::new();
        let mut right: Chain<usize> = Chain::new();
        left.add(&mut a, 0);
        left.add(&mut a, 1);
        right.add(&mut b, 0);
        right.add(&mut b, 1);
        assert!(left.equals(&a, &right, &b));

        right.add(&mut b, 2);
        assert!(!left.equals(&a, &right, &b));
    }
}
