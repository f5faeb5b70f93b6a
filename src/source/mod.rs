//! Contract consumed from the compressed graph.
//!
//! The compressed representation itself (encoding, loading, decompression)
//! lives outside this crate. All the view needs is the node count and lazy,
//! sentinel-terminated neighbour lists in both directions, plus optional
//! per-arc labels on the forward direction.

use std::sync::Arc;

use crate::types::{NodeId, PropValue};

pub mod memory;

pub use memory::MemoryGraph;

/// Returned by [`LazyNodeIter::next_node`] once a list is exhausted. No valid
/// node id equals this value.
pub const END_OF_LIST: u64 = u64::MAX;

/// A single-pass neighbour list, terminated by [`END_OF_LIST`].
pub trait LazyNodeIter {
    /// Next neighbour id, or [`END_OF_LIST`] forever once exhausted.
    fn next_node(&mut self) -> u64;
}

impl<I: LazyNodeIter + ?Sized> LazyNodeIter for Box<I> {
    fn next_node(&mut self) -> u64 {
        (**self).next_node()
    }
}

/// Read-only bidirectional adjacency, immutable for the lifetime of the process.
pub trait CompressedGraph {
    /// Cursor over a forward adjacency list.
    type Successors<'a>: LazyNodeIter
    where
        Self: 'a;
    /// Cursor over a backward adjacency list.
    type Predecessors<'a>: LazyNodeIter
    where
        Self: 'a;

    /// Node count; ids are dense in `[0, num_nodes)`.
    fn num_nodes(&self) -> u64;

    /// Forward adjacency of `node` in native order.
    fn successors(&self, node: NodeId) -> Self::Successors<'_>;

    /// Backward adjacency of `node` in native order.
    fn predecessors(&self, node: NodeId) -> Self::Predecessors<'_>;
}

impl<G: CompressedGraph> CompressedGraph for Arc<G> {
    type Successors<'a> = G::Successors<'a> where Self: 'a;
    type Predecessors<'a> = G::Predecessors<'a> where Self: 'a;

    fn num_nodes(&self) -> u64 {
        (**self).num_nodes()
    }

    fn successors(&self, node: NodeId) -> Self::Successors<'_> {
        (**self).successors(node)
    }

    fn predecessors(&self, node: NodeId) -> Self::Predecessors<'_> {
        (**self).predecessors(node)
    }
}

/// Forward cursor that also exposes the payload of the arc it last returned.
pub trait LabelledArcIter: LazyNodeIter {
    /// Label of the arc most recently produced by `next_node`, if any.
    fn label(&self) -> Option<&PropValue>;
}

/// Forward adjacency with per-arc label payloads.
pub trait LabelledGraph: Send + Sync {
    /// Successors of `node` together with their arc labels.
    fn labelled_successors(&self, node: NodeId) -> Box<dyn LabelledArcIter + '_>;
}

impl<G: LabelledGraph + ?Sized> LabelledGraph for Arc<G> {
    fn labelled_successors(&self, node: NodeId) -> Box<dyn LabelledArcIter + '_> {
        (**self).labelled_successors(node)
    }
}

/// Adapts a sentinel-terminated list into a fused [`Iterator`].
pub struct NodeIds<I> {
    inner: I,
    done: bool,
}

impl<I: LazyNodeIter> NodeIds<I> {
    /// Wraps a fresh cursor.
    pub fn new(inner: I) -> Self {
        Self { inner, done: false }
    }
}

impl<I: LazyNodeIter> Iterator for NodeIds<I> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next_node() {
            END_OF_LIST => {
                self.done = true;
                None
            }
            id => Some(NodeId(id)),
        }
    }
}

impl<I: LazyNodeIter> std::iter::FusedIterator for NodeIds<I> {}
