//! # Doubly-Linked Chain
//!
//! Like [`Chain`](super::Chain) but with backward links and a tail id, which
//! makes `push_last`, `pop_last` and erasing an arbitrary node O(1).

use std::fmt;

use super::node::{ChainNode, DChainNode, NodeRelease, NodeStore};
use super::slist::ChainIter;

/// Doubly-linked intrusive list.
///
/// `first` and `last` are both `None` or both `Some`. For every linked node,
/// `prev(next(x)) == x` and `next(prev(x)) == x` wherever the neighbor exists.
pub struct DChain<Id, const INDEX: usize = 0> {
    first: Option<Id>,
    last: Option<Id>,
}

impl<Id: Copy + Eq, const INDEX: usize> DChain<Id, INDEX> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first: None,
            last: None,
        }
    }

    /// First node, if any.
    #[inline]
    #[must_use]
    pub const fn first(&self) -> Option<Id> {
        self.first
    }

    /// Last node, if any. O(1).
    #[inline]
    #[must_use]
    pub const fn last(&self) -> Option<Id> {
        self.last
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
        S::Node: DChainNode<Id>,
    {
        self.iter(store).count()
    }

    /// Predecessor of `id`. O(1).
    #[inline]
    #[must_use]
    pub fn before<S>(&self, store: &S, id: Id) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        store.node(id).prev(INDEX)
    }

    /// True iff the node `id` itself is linked into this chain. O(n).
    #[must_use]
    pub fn has<S>(&self, store: &S, id: Id) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        self.iter(store).any(|(node, _)| node == id)
    }

    /// True iff some node in the chain equals `element`. O(n).
    #[must_use]
    pub fn contains<S>(&self, store: &S, element: &S::Node) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id> + PartialEq,
    {
        self.iter(store).any(|(_, node)| node == element)
    }

    /// Pushes `id` to the front. Same as [`push_first`](Self::push_first).
    #[inline]
    pub fn add<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        self.push_first(store, id);
    }

    /// Pushes `id` to the front.
    pub fn push_first<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let node = store.node_mut(id);
        node.set_prev(INDEX, None);
        node.set_next(INDEX, self.first);

        match self.first {
            Some(first) => store.node_mut(first).set_prev(INDEX, Some(id)),
            None => self.last = Some(id),
        }
        self.first = Some(id);
    }

    /// Pushes `id` to the back.
    pub fn push_last<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let node = store.node_mut(id);
        node.set_prev(INDEX, self.last);
        node.set_next(INDEX, None);

        match self.last {
            Some(last) => store.node_mut(last).set_next(INDEX, Some(id)),
            None => self.first = Some(id),
        }
        self.last = Some(id);
    }

    /// Unlinks and returns the first node.
    pub fn pop_first<S>(&mut self, store: &mut S) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let id = self.first?;
        self.erase(store, id);
        Some(id)
    }

    /// Unlinks and returns the last node.
    pub fn pop_last<S>(&mut self, store: &mut S) -> Option<Id>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let id = self.last?;
        self.erase(store, id);
        Some(id)
    }

    /// Links `id` right after `prev`, which must be in the chain.
    pub fn insert_after<S>(&mut self, store: &mut S, id: Id, prev: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        debug_assert!(id != prev);
        let next = store.node(prev).next(INDEX);

        let node = store.node_mut(id);
        node.set_prev(INDEX, Some(prev));
        node.set_next(INDEX, next);
        store.node_mut(prev).set_next(INDEX, Some(id));

        match next {
            Some(next) => store.node_mut(next).set_prev(INDEX, Some(id)),
            None => self.last = Some(id),
        }
    }

    /// Links `id` right before `next`, which must be in the chain.
    pub fn insert_before<S>(&mut self, store: &mut S, id: Id, next: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        debug_assert!(id != next);
        let prev = store.node(next).prev(INDEX);

        let node = store.node_mut(id);
        node.set_prev(INDEX, prev);
        node.set_next(INDEX, Some(next));
        store.node_mut(next).set_prev(INDEX, Some(id));

        match prev {
            Some(prev) => store.node_mut(prev).set_next(INDEX, Some(id)),
            None => self.first = Some(id),
        }
    }

    /// Unlinks `id`, which must be in the chain. O(1).
    ///
    /// The node's own links are reset so it can be linked again.
    pub fn erase<S>(&mut self, store: &mut S, id: Id)
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let node = store.node_mut(id);
        let prev = node.prev(INDEX);
        let next = node.next(INDEX);
        node.set_prev(INDEX, None);
        node.set_next(INDEX, None);

        match prev {
            Some(prev) => store.node_mut(prev).set_next(INDEX, next),
            None => {
                debug_assert!(self.first == Some(id), "erased node is not in the chain");
                self.first = next;
            }
        }
        match next {
            Some(next) => store.node_mut(next).set_prev(INDEX, prev),
            None => {
                debug_assert!(self.last == Some(id), "erased node is not in the chain");
                self.last = prev;
            }
        }
    }

    /// Forgets all nodes without touching them.
    #[inline]
    pub fn clear(&mut self) {
        self.first = None;
        self.last = None;
    }

    /// Destroys every node through the store and empties the chain.
    ///
    /// The chain must be the nodes' only owner.
    pub fn destroy_all<S>(&mut self, store: &mut S)
    where
        S: NodeRelease<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        let mut current = self.first.take();
        self.last = None;
        while let Some(id) = current {
            current = store.node(id).next(INDEX);
            store.release(id);
        }
    }

    /// Element-wise comparison with another chain, possibly over another store.
    #[must_use]
    pub fn equals<S, T>(&self, store: &S, other: &DChain<Id, INDEX>, other_store: &T) -> bool
    where
        S: NodeStore<Id> + ?Sized,
        T: NodeStore<Id, Node = S::Node> + ?Sized,
        S::Node: DChainNode<Id> + PartialEq,
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
        S::Node: DChainNode<Id>,
    {
        ChainIter {
            store,
            current: self.first,
        }
    }

    /// Iterates over `(id, node)` pairs from last to first.
    #[inline]
    pub fn iter_rev<'a, S>(&self, store: &'a S) -> DChainRevIter<'a, Id, S, INDEX>
    where
        S: NodeStore<Id> + ?Sized,
        S::Node: DChainNode<Id>,
    {
        DChainRevIter {
            store,
            current: self.last,
        }
    }
}

impl<Id: Copy + Eq, const INDEX: usize> Default for DChain<Id, INDEX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: fmt::Debug, const INDEX: usize> fmt::Debug for DChain<Id, INDEX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DChain")
            .field("index", &INDEX)
            .field("first", &self.first)
            .field("last", &self.last)
            .finish()
    }
}

/// Backward iterator over a [`DChain`].
pub struct DChainRevIter<'a, Id, S: ?Sized, const INDEX: usize> {
    store: &'a S,
    current: Option<Id>,
}

impl<'a, Id, S, const INDEX: usize> Iterator for DChainRevIter<'a, Id, S, INDEX>
where
    Id: Copy,
    S: NodeStore<Id> + ?Sized,
    S::Node: DChainNode<Id> + 'a,
{
    type Item = (Id, &'a S::Node);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.store.node(id);
        self.current = node.prev(INDEX);
        Some((id, node))
    }
}
