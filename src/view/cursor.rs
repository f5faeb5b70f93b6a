//! Single-pass cursors produced by [`GraphView`].
//!
//! Each cursor wraps one native, sentinel-terminated list and yields items in
//! exactly the order the source produces them. None of them can be rewound;
//! call the producing operation again for a fresh pass.

use std::iter::FusedIterator;

use crate::error::Result;
use crate::source::{CompressedGraph, NodeIds};
use crate::types::{Direction, EdgeKey, ElementId, NodeId};
use crate::view::element::{Edge, Vertex};
use crate::view::GraphView;

/// Every vertex in ascending id order. Handles are built fresh and bypass
/// the identity cache.
pub struct VertexIter<'g, G: CompressedGraph> {
    graph: &'g GraphView<G>,
    next: u64,
    end: u64,
}

impl<'g, G: CompressedGraph> VertexIter<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>) -> Self {
        Self {
            graph,
            next: 0,
            end: graph.num_nodes(),
        }
    }
}

impl<'g, G: CompressedGraph> Iterator for VertexIter<'g, G> {
    type Item = Vertex<'g, G>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let id = NodeId(self.next);
        self.next += 1;
        Some(self.graph.fresh_vertex(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl<G: CompressedGraph> ExactSizeIterator for VertexIter<'_, G> {}

impl<G: CompressedGraph> FusedIterator for VertexIter<'_, G> {}

/// Every arc, grouped by tail in ascending id order and by head in native
/// successor order. Holds only the current tail and its successor cursor.
pub struct EdgeIter<'g, G: CompressedGraph + 'g> {
    graph: &'g GraphView<G>,
    from: u64,
    succ: Option<NodeIds<G::Successors<'g>>>,
}

impl<'g, G: CompressedGraph + 'g> EdgeIter<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>) -> Self {
        Self {
            graph,
            from: 0,
            succ: None,
        }
    }
}

impl<'g, G: CompressedGraph + 'g> Iterator for EdgeIter<'g, G> {
    type Item = Edge<'g, G>;

    fn next(&mut self) -> Option<Self::Item> {
        let num_nodes = self.graph.num_nodes();
        loop {
            if let Some(succ) = self.succ.as_mut() {
                if let Some(to) = succ.next() {
                    return Some(self.graph.fresh_edge(EdgeKey {
                        from: NodeId(self.from),
                        to,
                    }));
                }
                self.succ = None;
                self.from += 1;
            }
            if self.from >= num_nodes {
                return None;
            }
            let source = self.graph.source();
            self.succ = Some(NodeIds::new(source.successors(NodeId(self.from))));
        }
    }
}

impl<'g, G: CompressedGraph + 'g> FusedIterator for EdgeIter<'g, G> {}

/// Neighbour ids tagged with the direction they were reached in. `Both`
/// drains the successors before opening the predecessor list.
pub struct NeighborIds<'g, G: CompressedGraph + 'g> {
    graph: &'g G,
    node: NodeId,
    out: Option<NodeIds<G::Successors<'g>>>,
    inc: Option<NodeIds<G::Predecessors<'g>>>,
    want_in: bool,
}

impl<'g, G: CompressedGraph + 'g> NeighborIds<'g, G> {
    pub(crate) fn new(graph: &'g G, node: NodeId, direction: Direction) -> Self {
        let out = direction
            .includes_out()
            .then(|| NodeIds::new(graph.successors(node)));
        Self {
            graph,
            node,
            out,
            inc: None,
            want_in: direction.includes_in(),
        }
    }
}

impl<'g, G: CompressedGraph + 'g> Iterator for NeighborIds<'g, G> {
    type Item = (NodeId, Direction);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(out) = self.out.as_mut() {
            if let Some(id) = out.next() {
                return Some((id, Direction::Out));
            }
            self.out = None;
        }
        if self.want_in {
            self.want_in = false;
            self.inc = Some(NodeIds::new(self.graph.predecessors(self.node)));
        }
        let id = self.inc.as_mut()?.next()?;
        Some((id, Direction::In))
    }
}

impl<'g, G: CompressedGraph + 'g> FusedIterator for NeighborIds<'g, G> {}

/// Neighbouring vertices, resolved through the vertex identity cache.
pub struct NeighborIter<'g, G: CompressedGraph + 'g> {
    graph: &'g GraphView<G>,
    ids: NeighborIds<'g, G>,
}

impl<'g, G: CompressedGraph + 'g> NeighborIter<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>, node: NodeId, direction: Direction) -> Self {
        Self {
            graph,
            ids: NeighborIds::new(graph.source(), node, direction),
        }
    }
}

impl<'g, G: CompressedGraph + 'g> Iterator for NeighborIter<'g, G> {
    type Item = Vertex<'g, G>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, _) = self.ids.next()?;
        Some(self.graph.cached_vertex(id))
    }
}

impl<'g, G: CompressedGraph + 'g> FusedIterator for NeighborIter<'g, G> {}

/// Incident edges: `(node, n)` for successors, `(n, node)` for predecessors,
/// resolved through the edge identity cache.
pub struct AdjacentEdgeIter<'g, G: CompressedGraph + 'g> {
    graph: &'g GraphView<G>,
    node: NodeId,
    ids: NeighborIds<'g, G>,
}

impl<'g, G: CompressedGraph + 'g> AdjacentEdgeIter<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>, node: NodeId, direction: Direction) -> Self {
        Self {
            graph,
            node,
            ids: NeighborIds::new(graph.source(), node, direction),
        }
    }
}

impl<'g, G: CompressedGraph + 'g> Iterator for AdjacentEdgeIter<'g, G> {
    type Item = Edge<'g, G>;

    fn next(&mut self) -> Option<Self::Item> {
        let (other, reached) = self.ids.next()?;
        let key = match reached {
            Direction::In => EdgeKey {
                from: other,
                to: self.node,
            },
            _ => EdgeKey {
                from: self.node,
                to: other,
            },
        };
        Some(self.graph.cached_edge(key))
    }
}

impl<'g, G: CompressedGraph + 'g> FusedIterator for AdjacentEdgeIter<'g, G> {}

/// Vertices for caller-supplied ids, in request order. A bad id fails its
/// own step only.
pub struct VerticesById<'g, G: CompressedGraph, I> {
    graph: &'g GraphView<G>,
    ids: I,
}

impl<'g, G: CompressedGraph, I> VerticesById<'g, G, I> {
    pub(crate) fn new(graph: &'g GraphView<G>, ids: I) -> Self {
        Self { graph, ids }
    }
}

impl<'g, G, I> Iterator for VerticesById<'g, G, I>
where
    G: CompressedGraph,
    I: Iterator,
    I::Item: Into<ElementId>,
{
    type Item = Result<Vertex<'g, G>>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?.into();
        Some(
            self.graph
                .resolve_vertex_id(&id)
                .map(|node| self.graph.cached_vertex(node)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

/// Edges for caller-supplied `(from, to)` pairs, in request order.
pub struct EdgesById<'g, G: CompressedGraph, I> {
    graph: &'g GraphView<G>,
    ids: I,
}

impl<'g, G: CompressedGraph, I> EdgesById<'g, G, I> {
    pub(crate) fn new(graph: &'g GraphView<G>, ids: I) -> Self {
        Self { graph, ids }
    }
}

impl<'g, G, I> Iterator for EdgesById<'g, G, I>
where
    G: CompressedGraph,
    I: Iterator,
    I::Item: Into<ElementId>,
{
    type Item = Result<Edge<'g, G>>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?.into();
        Some(
            self.graph
                .resolve_edge_id(&id)
                .map(|key| self.graph.cached_edge(key)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}
