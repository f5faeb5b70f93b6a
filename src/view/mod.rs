//! Read-only property-graph adapter over a [`CompressedGraph`].
//!
//! [`GraphView`] composes the topology source, a [`PropertyProvider`] and two
//! identity caches. Enumeration (`vertices`, `edges`) builds fresh handles;
//! lookups by id and neighbour traversal go through the caches. Either way
//! handles compare by id, so the caches never change what a caller sees.
//!
//! A view is single-threaded (`!Sync`). Share the source behind an
//! `Arc<G>` and open one view per thread for concurrent traversals.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tracing::{info, trace};

use crate::config::GraphConfig;
use crate::error::{GraphError, Result, UnsupportedOp};
use crate::property::PropertyProvider;
use crate::source::{CompressedGraph, NodeIds};
use crate::types::{Direction, EdgeKey, ElementId, NodeId};

pub mod cache;
pub mod cursor;
pub mod element;

pub use cache::{CacheStats, IdentityCache};
pub use cursor::{
    AdjacentEdgeIter, EdgeIter, EdgesById, NeighborIds, NeighborIter, VertexIter, VerticesById,
};
pub use element::{Edge, EdgeProperty, PropertyIter, PropertyOwner, Vertex, VertexProperty};

use element::{EdgeState, VertexState};

/// Counters for both identity caches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ViewCacheStats {
    /// Vertex identity cache.
    pub vertices: CacheStats,
    /// Edge identity cache.
    pub edges: CacheStats,
}

/// Property-graph view of a compressed graph `G`.
///
/// Owns the source, the property provider and the identity caches. All
/// mutating operations fail with [`GraphError::Unsupported`].
pub struct GraphView<G: CompressedGraph> {
    source: G,
    provider: PropertyProvider,
    config: GraphConfig,
    vertex_cache: RefCell<IdentityCache<NodeId, Rc<VertexState>>>,
    edge_cache: RefCell<IdentityCache<EdgeKey, Rc<EdgeState>>>,
    closed: bool,
}

impl<G: CompressedGraph> GraphView<G> {
    /// Wraps an already loaded source and provider. Cache sizes come from
    /// `config`.
    pub fn new(source: G, provider: PropertyProvider, config: GraphConfig) -> Result<Self> {
        let num_nodes = source.num_nodes();
        info!(
            base_path = %config.base_path.display(),
            num_nodes,
            vertex_cache = config.vertex_cache_capacity.get(),
            edge_cache = config.edge_cache_capacity.get(),
            "view.opened"
        );
        Ok(Self {
            vertex_cache: RefCell::new(IdentityCache::new(
                "vertex",
                config.vertex_cache_capacity,
            )),
            edge_cache: RefCell::new(IdentityCache::new("edge", config.edge_cache_capacity)),
            source,
            provider,
            config,
            closed: false,
        })
    }

    /// Loads the source from `config.base_path`, then the properties. If
    /// either step fails nothing is kept open: everything acquired so far is
    /// dropped before the error is returned.
    pub fn open<L, P>(config: GraphConfig, load_graph: L, load_properties: P) -> Result<Self>
    where
        L: FnOnce(&Path) -> Result<G>,
        P: FnOnce(&GraphConfig, &G) -> Result<PropertyProvider>,
    {
        let source = load_graph(&config.base_path)?;
        let provider = load_properties(&config, &source)?;
        Self::new(source, provider, config)
    }

    /// Number of vertices; ids run from 0 to `num_nodes() - 1`.
    pub fn num_nodes(&self) -> u64 {
        self.source.num_nodes()
    }

    /// The underlying topology.
    pub fn source(&self) -> &G {
        &self.source
    }

    /// Labels and property values.
    pub fn provider(&self) -> &PropertyProvider {
        &self.provider
    }

    /// Settings the view was opened with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Every vertex in ascending id order; each call is an independent pass.
    pub fn vertices(&self) -> VertexIter<'_, G> {
        VertexIter::new(self)
    }

    /// Vertices for `ids` in request order. Only integer ids are accepted.
    pub fn vertices_by_id<I>(&self, ids: I) -> VerticesById<'_, G, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Into<ElementId>,
    {
        VerticesById::new(self, ids.into_iter())
    }

    /// Cached handle for `id`, or [`GraphError::InvalidId`] past the last node.
    pub fn vertex(&self, id: NodeId) -> Result<Vertex<'_, G>> {
        self.check_node(id)?;
        Ok(self.cached_vertex(id))
    }

    /// Every arc, tail by tail in ascending id order.
    pub fn edges(&self) -> EdgeIter<'_, G> {
        EdgeIter::new(self)
    }

    /// Edges for `(from, to)` pairs in request order. Endpoints are checked
    /// against the node range; arc existence is not, see
    /// [`contains_edge`](Self::contains_edge).
    pub fn edges_by_id<I>(&self, ids: I) -> EdgesById<'_, G, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Into<ElementId>,
    {
        EdgesById::new(self, ids.into_iter())
    }

    /// Cached handle for `key`. Both endpoints must be in range.
    pub fn edge(&self, key: EdgeKey) -> Result<Edge<'_, G>> {
        self.check_node(key.from)?;
        self.check_node(key.to)?;
        Ok(self.cached_edge(key))
    }

    /// Whether `key.to` occurs among the successors of `key.from`. Linear in
    /// the out-degree of `key.from`.
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        key.from.0 < self.num_nodes()
            && NodeIds::new(self.source.successors(key.from)).any(|to| to == key.to)
    }

    /// Vertices adjacent to `id` in `direction`, one per arc.
    pub fn neighbors(&self, id: NodeId, direction: Direction) -> Result<NeighborIter<'_, G>> {
        self.check_node(id)?;
        Ok(NeighborIter::new(self, id, direction))
    }

    /// Arcs incident to `id` in `direction`, oriented as stored.
    pub fn adjacent_edges(
        &self,
        id: NodeId,
        direction: Direction,
    ) -> Result<AdjacentEdgeIter<'_, G>> {
        self.check_node(id)?;
        Ok(AdjacentEdgeIter::new(self, id, direction))
    }

    /// Always [`UnsupportedOp::VertexAddition`].
    pub fn add_vertex(&self, _label: &str) -> Result<Vertex<'_, G>> {
        Err(GraphError::unsupported(UnsupportedOp::VertexAddition))
    }

    /// Always [`UnsupportedOp::Transactions`].
    pub fn tx(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::Transactions))
    }

    /// Always [`UnsupportedOp::GraphComputer`].
    pub fn compute(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::GraphComputer))
    }

    /// Always [`UnsupportedOp::Variables`].
    pub fn variables(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::Variables))
    }

    /// Snapshot of both identity caches' counters.
    pub fn cache_stats(&self) -> ViewCacheStats {
        ViewCacheStats {
            vertices: self.vertex_cache.borrow().stats(),
            edges: self.edge_cache.borrow().stats(),
        }
    }

    /// Drops both identity caches and unmaps file-backed property data.
    /// Topology and computed properties stay readable; file-backed reads
    /// fail with [`GraphError::Closed`]. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.vertex_cache.get_mut().clear();
        self.edge_cache.get_mut().clear();
        self.provider.release();
        self.closed = true;
        info!(base_path = %self.config.base_path.display(), "view.closed");
        Ok(())
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        let num_nodes = self.num_nodes();
        if id.0 >= num_nodes {
            return Err(GraphError::InvalidId {
                id: id.0,
                num_nodes,
            });
        }
        Ok(())
    }

    pub(crate) fn resolve_vertex_id(&self, id: &ElementId) -> Result<NodeId> {
        match *id {
            ElementId::Int(raw) => {
                let node = u64::try_from(raw).map_err(|_| GraphError::InvalidIdType {
                    expected: "non-negative integer",
                    found: "negative integer",
                })?;
                self.check_node(NodeId(node))?;
                Ok(NodeId(node))
            }
            ref other => Err(GraphError::InvalidIdType {
                expected: "integer",
                found: other.kind_name(),
            }),
        }
    }

    pub(crate) fn resolve_edge_id(&self, id: &ElementId) -> Result<EdgeKey> {
        match *id {
            ElementId::Pair(from, to) => Ok(EdgeKey {
                from: self.resolve_vertex_id(&ElementId::Int(from))?,
                to: self.resolve_vertex_id(&ElementId::Int(to))?,
            }),
            ref other => Err(GraphError::InvalidIdType {
                expected: "integer pair",
                found: other.kind_name(),
            }),
        }
    }

    pub(crate) fn cached_vertex(&self, id: NodeId) -> Vertex<'_, G> {
        let state = self.vertex_cache.borrow_mut().get_or_create(id, |id| {
            trace!(node = %id, "view.vertex.created");
            Rc::new(VertexState::new(id))
        });
        Vertex::new(self, state)
    }

    pub(crate) fn cached_edge(&self, key: EdgeKey) -> Edge<'_, G> {
        let state = self.edge_cache.borrow_mut().get_or_create(key, |key| {
            trace!(edge = %key, "view.edge.created");
            Rc::new(EdgeState::new(key))
        });
        Edge::new(self, state)
    }

    pub(crate) fn fresh_vertex(&self, id: NodeId) -> Vertex<'_, G> {
        Vertex::new(self, Rc::new(VertexState::new(id)))
    }

    pub(crate) fn fresh_edge(&self, key: EdgeKey) -> Edge<'_, G> {
        Edge::new(self, Rc::new(EdgeState::new(key)))
    }
}

impl<G: CompressedGraph> std::fmt::Debug for GraphView<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("base_path", &self.config.base_path)
            .field("num_nodes", &self.num_nodes())
            .field("provider", &self.provider)
            .field("closed", &self.closed)
            .finish()
    }
}
