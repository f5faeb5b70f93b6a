//! Whole-graph traversals written directly against the view.

use ahash::AHashSet;

use crate::error::Result;
use crate::source::{CompressedGraph, NodeIds};
use crate::types::{Direction, NodeId};
use crate::view::{GraphView, Vertex};

/// Vertices without predecessors, in ascending id order.
pub fn roots<G: CompressedGraph>(view: &GraphView<G>) -> impl Iterator<Item = NodeId> + '_ {
    let source = view.source();
    (0..view.num_nodes())
        .map(NodeId)
        .filter(move |&node| NodeIds::new(source.predecessors(node)).next().is_none())
}

/// Depth-first preorder from every root, following successors in native
/// order. Vertices reachable only through cycles are not visited.
///
/// Works on raw ids with a dense visited bitmap and never touches the
/// identity caches.
pub fn dfs_from_roots<G: CompressedGraph>(view: &GraphView<G>) -> Vec<NodeId> {
    let source = view.source();
    let mut visited = Bitmap::new(view.num_nodes());
    let mut order = Vec::new();
    let mut stack = Vec::new();

    for root in roots(view) {
        if !visited.insert(root.0) {
            continue;
        }
        order.push(root);
        stack.push(NodeIds::new(source.successors(root)));
        while let Some(top) = stack.last_mut() {
            match top.next() {
                Some(child) => {
                    if visited.insert(child.0) {
                        order.push(child);
                        stack.push(NodeIds::new(source.successors(child)));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
    order
}

/// Same walk as [`dfs_from_roots`], but through vertex handles and a hash
/// set of visited handles, exercising handle equality and the vertex cache.
pub fn dfs_from_roots_with_handles<G: CompressedGraph>(view: &GraphView<G>) -> Vec<NodeId> {
    let mut visited: AHashSet<Vertex<'_, G>> = AHashSet::new();
    let mut order = Vec::new();
    let mut stack = Vec::new();

    for root in roots(view) {
        let root = view.fresh_vertex(root);
        if !visited.insert(root.clone()) {
            continue;
        }
        order.push(root.id());
        stack.push(root.neighbors(Direction::Out));
        while let Some(top) = stack.last_mut() {
            match top.next() {
                Some(child) => {
                    if !visited.contains(&child) {
                        order.push(child.id());
                        stack.push(child.neighbors(Direction::Out));
                        visited.insert(child);
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
    order
}

/// Breadth-first levels from `start` along `direction`, up to `max_depth`
/// levels. Returns each reached vertex with its depth, `start` at depth 0.
pub fn bfs<G: CompressedGraph>(
    view: &GraphView<G>,
    start: NodeId,
    direction: Direction,
    max_depth: usize,
) -> Result<Vec<(NodeId, usize)>> {
    let mut visited = Bitmap::new(view.num_nodes());
    let mut current = vec![start];
    let mut result = Vec::new();
    view.vertex(start)?;
    visited.insert(start.0);

    for depth in 0..max_depth {
        let mut next = Vec::new();
        for &node in &current {
            result.push((node, depth));
        }
        for node in current.drain(..) {
            for neighbor in view.neighbors(node, direction)? {
                if visited.insert(neighbor.id().0) {
                    next.push(neighbor.id());
                }
            }
        }
        if next.is_empty() {
            break;
        }
        current = next;
    }
    Ok(result)
}

/// One bit per node id.
struct Bitmap {
    words: Vec<u64>,
}

impl Bitmap {
    fn new(bits: u64) -> Self {
        let words = usize::try_from(bits.div_ceil(64)).unwrap_or(usize::MAX);
        Self {
            words: vec![0; words],
        }
    }

    /// Sets `bit`; returns `false` if it was already set.
    fn insert(&mut self, bit: u64) -> bool {
        let word = &mut self.words[(bit / 64) as usize];
        let mask = 1u64 << (bit % 64);
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::property::PropertyProvider;
    use crate::source::MemoryGraph;

    fn view(num_nodes: u64, arcs: &[(u64, u64)]) -> GraphView<MemoryGraph> {
        let graph = MemoryGraph::from_arcs(num_nodes, arcs).unwrap();
        let config = GraphConfig::new("/mem/dfs", 2, 2).unwrap();
        GraphView::new(graph, PropertyProvider::builder().build(), config).unwrap()
    }

    #[test]
    fn bitmap_tracks_bits_across_words() {
        let mut bits = Bitmap::new(130);
        assert!(bits.insert(0));
        assert!(bits.insert(129));
        assert!(!bits.insert(129));
        assert!(bits.insert(64));
        assert!(!bits.insert(0));
    }

    #[test]
    fn roots_have_no_predecessors() {
        let view = view(5, &[(0, 1), (2, 1), (1, 3)]);
        assert_eq!(
            roots(&view).collect::<Vec<_>>(),
            vec![NodeId(0), NodeId(2), NodeId(4)]
        );
    }

    #[test]
    fn preorder_follows_native_successor_order() {
        let view = view(6, &[(0, 1), (0, 4), (1, 2), (1, 3), (4, 3), (5, 0)]);
        let ids: Vec<u64> = dfs_from_roots(&view).into_iter().map(|n| n.0).collect();
        assert_eq!(ids, vec![5, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn bfs_respects_depth_limit() {
        let view = view(4, &[(0, 1), (1, 2), (2, 3)]);
        let levels = bfs(&view, NodeId(0), Direction::Out, 2).unwrap();
        assert_eq!(levels, vec![(NodeId(0), 0), (NodeId(1), 1)]);
        assert!(bfs(&view, NodeId(9), Direction::Out, 2).is_err());
    }
}
