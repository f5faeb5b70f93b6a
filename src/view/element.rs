//! Vertex, edge and property handles handed to traversal code.
//!
//! A handle is a thin wrapper around an id and a borrow of its
//! [`GraphView`]. The per-id state behind it (memoised label and property
//! values) may come from the identity cache or be freshly built; equality
//! and hashing look only at the id, so the two are interchangeable.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;
use siphasher::sip::SipHasher13;
use smallvec::SmallVec;

use crate::error::{GraphError, Result, UnsupportedOp};
use crate::source::CompressedGraph;
use crate::types::{Direction, EdgeKey, NodeId, PropValue};
use crate::view::cursor::{AdjacentEdgeIter, NeighborIter};
use crate::view::GraphView;

type PropMemo = RefCell<AHashMap<Arc<str>, Option<PropValue>>>;

pub(crate) struct VertexState {
    id: NodeId,
    label: OnceCell<String>,
    props: PropMemo,
}

impl VertexState {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            label: OnceCell::new(),
            props: RefCell::new(AHashMap::new()),
        }
    }
}

pub(crate) struct EdgeState {
    key: EdgeKey,
    label: OnceCell<String>,
    props: PropMemo,
}

impl EdgeState {
    pub(crate) fn new(key: EdgeKey) -> Self {
        Self {
            key,
            label: OnceCell::new(),
            props: RefCell::new(AHashMap::new()),
        }
    }
}

/// Looks `key` up in the memo, falling back to `fetch` on a miss. Failed
/// fetches are not memoised so a later read can retry.
fn memoised<F>(memo: &PropMemo, key: &str, fetch: F) -> Result<Option<(Arc<str>, PropValue)>>
where
    F: FnOnce() -> Result<Option<PropValue>>,
{
    if let Some((cached_key, value)) = memo.borrow().get_key_value(key) {
        return Ok(value.clone().map(|value| (cached_key.clone(), value)));
    }
    let value = fetch()?;
    let key: Arc<str> = Arc::from(key);
    memo.borrow_mut().insert(key.clone(), value.clone());
    Ok(value.map(|value| (key, value)))
}

/// Elements whose properties can be enumerated through [`PropertyIter`].
pub trait PropertyOwner {
    /// Property handle produced for this element.
    type Property;

    /// Keys registered for this element, in registration order.
    fn registered_keys(&self) -> &[Arc<str>];

    /// Resolves one key; `None` when the key is unknown or has no value here.
    fn property(&self, key: &str) -> Result<Option<Self::Property>>;
}

enum KeyList<'a> {
    Registered(&'a [Arc<str>]),
    Requested(&'a [&'a str]),
}

impl KeyList<'_> {
    fn get(&self, idx: usize) -> Option<&str> {
        match self {
            KeyList::Registered(keys) => keys.get(idx).map(|key| &**key),
            KeyList::Requested(keys) => keys.get(idx).copied(),
        }
    }

    fn len(&self) -> usize {
        match self {
            KeyList::Registered(keys) => keys.len(),
            KeyList::Requested(keys) => keys.len(),
        }
    }
}

/// Lazily resolves properties one key at a time, skipping absent values.
pub struct PropertyIter<'a, E> {
    owner: &'a E,
    keys: KeyList<'a>,
    next: usize,
}

impl<'a, E: PropertyOwner> PropertyIter<'a, E> {
    pub(crate) fn new(owner: &'a E, requested: &'a [&'a str]) -> Self {
        let keys = if requested.is_empty() {
            KeyList::Registered(owner.registered_keys())
        } else {
            KeyList::Requested(requested)
        };
        Self {
            owner,
            keys,
            next: 0,
        }
    }
}

impl<E: PropertyOwner> Iterator for PropertyIter<'_, E> {
    type Item = Result<E::Property>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.keys.get(self.next) {
            self.next += 1;
            match self.owner.property(key) {
                Ok(Some(property)) => return Some(Ok(property)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len().saturating_sub(self.next)))
    }
}

/// Vertex handle; cheap to clone, compared and hashed by id.
pub struct Vertex<'g, G: CompressedGraph> {
    graph: &'g GraphView<G>,
    state: Rc<VertexState>,
}

impl<'g, G: CompressedGraph> Vertex<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>, state: Rc<VertexState>) -> Self {
        Self { graph, state }
    }

    /// Dense id assigned by the source.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    /// The view this handle belongs to.
    pub fn graph(&self) -> &'g GraphView<G> {
        self.graph
    }

    /// Resolved on first access and kept for the life of this handle's state.
    pub fn label(&self) -> &str {
        self.state
            .label
            .get_or_init(|| self.graph.provider().vertex_label(self.state.id))
    }

    /// Same as [`GraphView::neighbors`] for this vertex.
    pub fn neighbors(&self, direction: Direction) -> NeighborIter<'g, G> {
        NeighborIter::new(self.graph, self.state.id, direction)
    }

    /// Same as [`GraphView::adjacent_edges`] for this vertex.
    pub fn edges(&self, direction: Direction) -> AdjacentEdgeIter<'g, G> {
        AdjacentEdgeIter::new(self.graph, self.state.id, direction)
    }

    /// All present properties when `keys` is empty, otherwise only the
    /// requested ones in the requested order.
    pub fn properties<'a>(&'a self, keys: &'a [&'a str]) -> PropertyIter<'a, Self> {
        PropertyIter::new(self, keys)
    }

    /// `None` when `key` is unknown or has no value for this vertex. Values
    /// are memoised on first read; failed reads are not.
    pub fn property(&self, key: &str) -> Result<Option<VertexProperty<'g, G>>> {
        let resolved = memoised(&self.state.props, key, || {
            self.graph.provider().vertex_property(key, self.state.id)
        })?;
        Ok(resolved.map(|(key, value)| VertexProperty {
            vertex: self.clone(),
            key,
            value,
        }))
    }

    /// Value part of [`property`](Self::property).
    pub fn value(&self, key: &str) -> Result<Option<PropValue>> {
        Ok(self.property(key)?.map(|property| property.value))
    }

    /// Always unsupported.
    pub fn set_property(&self, _key: &str, _value: PropValue) -> Result<VertexProperty<'g, G>> {
        Err(GraphError::unsupported(UnsupportedOp::VertexPropertyMutation))
    }

    /// Always unsupported.
    pub fn add_edge(&self, _label: &str, _head: &Vertex<'g, G>) -> Result<Edge<'g, G>> {
        Err(GraphError::unsupported(UnsupportedOp::EdgeAddition))
    }

    /// Always unsupported.
    pub fn remove(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::VertexRemoval))
    }
}

impl<'g, G: CompressedGraph> PropertyOwner for Vertex<'g, G> {
    type Property = VertexProperty<'g, G>;

    fn registered_keys(&self) -> &[Arc<str>] {
        self.graph.provider().vertex_property_keys(self.state.id)
    }

    fn property(&self, key: &str) -> Result<Option<VertexProperty<'g, G>>> {
        Vertex::property(self, key)
    }
}

impl<G: CompressedGraph> Clone for Vertex<'_, G> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            state: Rc::clone(&self.state),
        }
    }
}

impl<G: CompressedGraph> PartialEq for Vertex<'_, G> {
    fn eq(&self, other: &Self) -> bool {
        self.state.id == other.state.id
    }
}

impl<G: CompressedGraph> Eq for Vertex<'_, G> {}

impl<G: CompressedGraph> Hash for Vertex<'_, G> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.id.hash(state);
    }
}

impl<G: CompressedGraph> fmt::Debug for Vertex<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.state.id)
    }
}

impl<G: CompressedGraph> fmt::Display for Vertex<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.state.id)
    }
}

/// Edge handle keyed by `(from, to)`; parallel arcs share one handle.
pub struct Edge<'g, G: CompressedGraph> {
    graph: &'g GraphView<G>,
    state: Rc<EdgeState>,
}

impl<'g, G: CompressedGraph> Edge<'g, G> {
    pub(crate) fn new(graph: &'g GraphView<G>, state: Rc<EdgeState>) -> Self {
        Self { graph, state }
    }

    /// Endpoint pair.
    pub fn id(&self) -> EdgeKey {
        self.state.key
    }

    /// The view this handle belongs to.
    pub fn graph(&self) -> &'g GraphView<G> {
        self.graph
    }

    /// Resolved on first access, like [`Vertex::label`].
    pub fn label(&self) -> &str {
        self.state.label.get_or_init(|| {
            self.graph
                .provider()
                .edge_label(self.state.key.from, self.state.key.to)
        })
    }

    /// Tail of the edge.
    pub fn out_vertex(&self) -> Vertex<'g, G> {
        self.graph.cached_vertex(self.state.key.from)
    }

    /// Head of the edge.
    pub fn in_vertex(&self) -> Vertex<'g, G> {
        self.graph.cached_vertex(self.state.key.to)
    }

    /// `Out` yields the tail, `In` the head, `Both` the tail then the head.
    pub fn vertices(&self, direction: Direction) -> smallvec::IntoIter<[Vertex<'g, G>; 2]> {
        let mut ends: SmallVec<[Vertex<'g, G>; 2]> = SmallVec::new();
        if direction.includes_out() {
            ends.push(self.out_vertex());
        }
        if direction.includes_in() {
            ends.push(self.in_vertex());
        }
        ends.into_iter()
    }

    /// See [`Vertex::properties`].
    pub fn properties<'a>(&'a self, keys: &'a [&'a str]) -> PropertyIter<'a, Self> {
        PropertyIter::new(self, keys)
    }

    /// See [`Vertex::property`].
    pub fn property(&self, key: &str) -> Result<Option<EdgeProperty<'g, G>>> {
        let EdgeKey { from, to } = self.state.key;
        let resolved = memoised(&self.state.props, key, || {
            self.graph.provider().edge_property(key, from, to)
        })?;
        Ok(resolved.map(|(key, value)| EdgeProperty {
            edge: self.clone(),
            key,
            value,
        }))
    }

    /// Value part of [`property`](Self::property).
    pub fn value(&self, key: &str) -> Result<Option<PropValue>> {
        Ok(self.property(key)?.map(|property| property.value))
    }

    /// Always unsupported.
    pub fn set_property(&self, _key: &str, _value: PropValue) -> Result<EdgeProperty<'g, G>> {
        Err(GraphError::unsupported(UnsupportedOp::EdgePropertyMutation))
    }

    /// Always unsupported.
    pub fn remove(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::EdgeRemoval))
    }
}

impl<'g, G: CompressedGraph> PropertyOwner for Edge<'g, G> {
    type Property = EdgeProperty<'g, G>;

    fn registered_keys(&self) -> &[Arc<str>] {
        self.graph
            .provider()
            .edge_property_keys(self.state.key.from, self.state.key.to)
    }

    fn property(&self, key: &str) -> Result<Option<EdgeProperty<'g, G>>> {
        Edge::property(self, key)
    }
}

impl<G: CompressedGraph> Clone for Edge<'_, G> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            state: Rc::clone(&self.state),
        }
    }
}

impl<G: CompressedGraph> PartialEq for Edge<'_, G> {
    fn eq(&self, other: &Self) -> bool {
        self.state.key == other.state.key
    }
}

impl<G: CompressedGraph> Eq for Edge<'_, G> {}

impl<G: CompressedGraph> Hash for Edge<'_, G> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.key.hash(state);
    }
}

impl<G: CompressedGraph> fmt::Debug for Edge<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.state.key)
    }
}

impl<G: CompressedGraph> fmt::Display for Edge<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.state.key)
    }
}

/// A present `(key, value)` pair on a vertex.
pub struct VertexProperty<'g, G: CompressedGraph> {
    vertex: Vertex<'g, G>,
    key: Arc<str>,
    value: PropValue,
}

impl<'g, G: CompressedGraph> VertexProperty<'g, G> {
    /// Property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Property value.
    pub fn value(&self) -> &PropValue {
        &self.value
    }

    /// Consumes the handle, keeping the value.
    pub fn into_value(self) -> PropValue {
        self.value
    }

    /// Owning vertex.
    pub fn element(&self) -> &Vertex<'g, G> {
        &self.vertex
    }

    /// SipHash-1-3 (zero keys) over the key, the value and the owning vertex
    /// id, so the same property gets the same id across builds and runs.
    pub fn id(&self) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        hasher.write(self.key.as_bytes());
        hasher.write_u8(0xff);
        self.value.hash_into(&mut hasher);
        hasher.write(&self.vertex.id().0.to_le_bytes());
        hasher.finish()
    }

    /// Meta-properties are not supported.
    pub fn meta_property(&self, _key: &str) -> Result<Option<PropValue>> {
        Err(GraphError::unsupported(UnsupportedOp::MetaProperties))
    }

    /// Meta-properties are not supported.
    pub fn set_meta_property(&self, _key: &str, _value: PropValue) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::MetaProperties))
    }

    /// Always unsupported.
    pub fn remove(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::PropertyRemoval))
    }
}

impl<G: CompressedGraph> Clone for VertexProperty<'_, G> {
    fn clone(&self) -> Self {
        Self {
            vertex: self.vertex.clone(),
            key: Arc::clone(&self.key),
            value: self.value.clone(),
        }
    }
}

impl<G: CompressedGraph> PartialEq for VertexProperty<'_, G> {
    fn eq(&self, other: &Self) -> bool {
        self.vertex == other.vertex && self.key == other.key && self.value == other.value
    }
}

impl<G: CompressedGraph> fmt::Debug for VertexProperty<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vp[{}->{}]", self.key, self.value)
    }
}

/// A present `(key, value)` pair on an edge.
pub struct EdgeProperty<'g, G: CompressedGraph> {
    edge: Edge<'g, G>,
    key: Arc<str>,
    value: PropValue,
}

impl<'g, G: CompressedGraph> EdgeProperty<'g, G> {
    /// Property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Property value.
    pub fn value(&self) -> &PropValue {
        &self.value
    }

    /// Consumes the handle, keeping the value.
    pub fn into_value(self) -> PropValue {
        self.value
    }

    /// Owning edge.
    pub fn element(&self) -> &Edge<'g, G> {
        &self.edge
    }

    /// Always unsupported.
    pub fn remove(&self) -> Result<()> {
        Err(GraphError::unsupported(UnsupportedOp::PropertyRemoval))
    }
}

impl<G: CompressedGraph> Clone for EdgeProperty<'_, G> {
    fn clone(&self) -> Self {
        Self {
            edge: self.edge.clone(),
            key: Arc::clone(&self.key),
            value: self.value.clone(),
        }
    }
}

impl<G: CompressedGraph> PartialEq for EdgeProperty<'_, G> {
    fn eq(&self, other: &Self) -> bool {
        self.edge == other.edge && self.key == other.key && self.value == other.value
    }
}

impl<G: CompressedGraph> fmt::Debug for EdgeProperty<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p[{}->{}]", self.key, self.value)
    }
}
