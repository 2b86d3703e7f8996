//! Node and store contracts shared by [`Chain`](super::Chain) and
//! [`DChain`](super::DChain).

use crate::memory::{SlotArena, SlotHandle};

/// Resolves node ids to nodes.
///
/// Chains never own their nodes. The store does, and every chain operation
/// borrows it for exactly as long as the operation runs.
pub trait NodeStore<Id: Copy> {
    /// Node type stored under each id.
    type Node;

    /// Node behind `id`.
    ///
    /// Implementations panic if `id` does not name a live node.
    fn node(&self, id: Id) -> &Self::Node;

    /// Mutable node behind `id`.
    fn node_mut(&mut self, id: Id) -> &mut Self::Node;
}

/// A store that can also destroy nodes, used by `destroy_all`.
pub trait NodeRelease<Id: Copy>: NodeStore<Id> {
    /// Destroys the node behind `id` and frees its storage.
    fn release(&mut self, id: Id);
}

/// A node with forward links.
///
/// `index` selects one of the node's link fields, so one node can sit in as
/// many independent chains as it reserves link slots for.
pub trait ChainNode<Id> {
    /// Next node in the chain using link `index`.
    fn next(&self, index: usize) -> Option<Id>;

    /// Sets the forward link `index`.
    fn set_next(&mut self, index: usize, next: Option<Id>);
}

/// A node with forward and backward links.
pub trait DChainNode<Id>: ChainNode<Id> {
    /// Previous node in the chain using link `index`.
    fn prev(&self, index: usize) -> Option<Id>;

    /// Sets the backward link `index`.
    fn set_prev(&mut self, index: usize, prev: Option<Id>);
}

/// Forward link fields for `N` independent singly-linked chains.
///
/// Embed it in a node and forward [`ChainNode`] to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainLinks<Id, const N: usize = 1> {
    next: [Option<Id>; N],
}

impl<Id: Copy, const N: usize> ChainLinks<Id, N> {
    /// Unlinked fields.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: [None; N] }
    }

    /// Forward link `index`.
    #[inline]
    #[must_use]
    pub fn next(&self, index: usize) -> Option<Id> {
        self.next[index]
    }

    /// Sets forward link `index`.
    #[inline]
    pub fn set_next(&mut self, index: usize, next: Option<Id>) {
        self.next[index] = next;
    }
}

impl<Id: Copy, const N: usize> Default for ChainLinks<Id, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward and backward link fields for `N` independent doubly-linked chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DChainLinks<Id, const N: usize = 1> {
    next: [Option<Id>; N],
    prev: [Option<Id>; N],
}

impl<Id: Copy, const N: usize> DChainLinks<Id, N> {
    /// Unlinked fields.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: [None; N],
            prev: [None; N],
        }
    }

    /// Forward link `index`.
    #[inline]
    #[must_use]
    pub fn next(&self, index: usize) -> Option<Id> {
        self.next[index]
    }

    /// Sets forward link `index`.
    #[inline]
    pub fn set_next(&mut self, index: usize, next: Option<Id>) {
        self.next[index] = next;
    }

    /// Backward link `index`.
    #[inline]
    #[must_use]
    pub fn prev(&self, index: usize) -> Option<Id> {
        self.prev[index]
    }

    /// Sets backward link `index`.
    #[inline]
    pub fn set_prev(&mut self, index: usize, prev: Option<Id>) {
        self.prev[index] = prev;
    }
}

impl<Id: Copy, const N: usize> Default for DChainLinks<Id, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeStore<SlotHandle> for SlotArena<T> {
    type Node = T;

    fn node(&self, id: SlotHandle) -> &T {
        match self.get(id) {
            Some(node) => node,
            None => panic!("chain node {id:?} is not a live slot"),
        }
    }

    fn node_mut(&mut self, id: SlotHandle) -> &mut T {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("chain node {id:?} is not a live slot"),
        }
    }
}

impl<T> NodeRelease<SlotHandle> for SlotArena<T> {
    fn release(&mut self, id: SlotHandle) {
        drop(self.deallocate(id));
    }
}

impl<T> NodeStore<usize> for [T] {
    type Node = T;

    #[inline]
    fn node(&self, id: usize) -> &T {
        &self[id]
    }

    #[inline]
    fn node_mut(&mut self, id: usize) -> &mut T {
        &mut self[id]
    }
}

impl<T> NodeStore<usize> for Vec<T> {
    type Node = T;

    #[inline]
    fn node(&self, id: usize) -> &T {
        &self[id]
    }

    #[inline]
    fn node_mut(&mut self, id: usize) -> &mut T {
        &mut self[id]
    }
}
