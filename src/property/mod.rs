//! Labels and property values for vertices and edges.
//!
//! A [`PropertyProvider`] is assembled once with a [`PropertyProviderBuilder`]
//! and is read-only afterwards. Every registered key applies to every
//! vertex (or edge); a node without data for a key simply resolves to `None`.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::error::{GraphError, KeyScope, Result};
use crate::types::{NodeId, PropValue};

pub mod arc_label;
pub mod codec;
pub mod file;

pub use arc_label::{ArcLabelProperty, ArcLabelSubProperty};
pub use codec::{text_offsets_path, EdgeCodec, ValueType, VertexCodec};
pub use file::{write_fixed_numeric, write_text, FixedNumericFile, TextFile, ABSENT_NUMERIC};

/// Maps a node to its label.
pub type VertexLabeller = Box<dyn Fn(NodeId) -> String + Send + Sync>;
/// Maps an arc to its label.
pub type EdgeLabeller = Box<dyn Fn(NodeId, NodeId) -> String + Send + Sync>;

/// Label used when no vertex labeller is registered.
pub const DEFAULT_VERTEX_LABEL: &str = "vertex";
/// Label used when no edge labeller is registered.
pub const DEFAULT_EDGE_LABEL: &str = "edge";

/// Key registry preserving registration order.
struct Registry<C> {
    scope: KeyScope,
    keys: Vec<Arc<str>>,
    codecs: Vec<C>,
    index: AHashMap<Arc<str>, usize>,
}

impl<C> Registry<C> {
    fn new(scope: KeyScope) -> Self {
        Self {
            scope,
            keys: Vec::new(),
            codecs: Vec::new(),
            index: AHashMap::new(),
        }
    }

    fn insert(&mut self, key: &str, codec: C) -> Result<()> {
        if self.index.contains_key(key) {
            return Err(GraphError::DuplicateKey {
                scope: self.scope,
                key: key.to_owned(),
            });
        }
        let key: Arc<str> = Arc::from(key);
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        self.codecs.push(codec);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&C> {
        self.index.get(key).map(|&idx| &self.codecs[idx])
    }

    fn into_entries(self) -> impl Iterator<Item = (Arc<str>, C)> {
        self.keys.into_iter().zip(self.codecs)
    }
}

/// Assembles a [`PropertyProvider`]. Registration fails on the first
/// duplicate key; a failed builder is dropped along with any files it mapped.
pub struct PropertyProviderBuilder {
    vertex_labeller: Option<VertexLabeller>,
    edge_labeller: Option<EdgeLabeller>,
    vertex: Registry<VertexCodec>,
    edge: Registry<EdgeCodec>,
}

impl Default for PropertyProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyProviderBuilder {
    /// No labellers and no keys.
    pub fn new() -> Self {
        Self {
            vertex_labeller: None,
            edge_labeller: None,
            vertex: Registry::new(KeyScope::Vertex),
            edge: Registry::new(KeyScope::Edge),
        }
    }

    /// Replaces the default vertex label.
    pub fn vertex_labeller<F>(mut self, labeller: F) -> Self
    where
        F: Fn(NodeId) -> String + Send + Sync + 'static,
    {
        self.vertex_labeller = Some(Box::new(labeller));
        self
    }

    /// Replaces the default edge label.
    pub fn edge_labeller<F>(mut self, labeller: F) -> Self
    where
        F: Fn(NodeId, NodeId) -> String + Send + Sync + 'static,
    {
        self.edge_labeller = Some(Box::new(labeller));
        self
    }

    /// Registers `key` for every vertex. Fails on a duplicate key.
    pub fn vertex_property(mut self, key: &str, codec: VertexCodec) -> Result<Self> {
        self.vertex.insert(key, codec)?;
        Ok(self)
    }

    /// Registers `key` for every edge. Fails on a duplicate key.
    pub fn edge_property(mut self, key: &str, codec: impl Into<EdgeCodec>) -> Result<Self> {
        self.edge.insert(key, codec.into())?;
        Ok(self)
    }

    /// Folds every registration of `other` into this builder, keeping this
    /// builder's labellers where both define one. Any key present in both
    /// fails the merge.
    pub fn merge(mut self, other: PropertyProviderBuilder) -> Result<Self> {
        if self.vertex_labeller.is_none() {
            self.vertex_labeller = other.vertex_labeller;
        }
        if self.edge_labeller.is_none() {
            self.edge_labeller = other.edge_labeller;
        }
        for (key, codec) in other.vertex.into_entries() {
            self.vertex.insert(&key, codec)?;
        }
        for (key, codec) in other.edge.into_entries() {
            self.edge.insert(&key, codec)?;
        }
        Ok(self)
    }

    /// Freezes the registrations; unset labellers fall back to the defaults.
    pub fn build(self) -> PropertyProvider {
        debug!(
            vertex_keys = self.vertex.keys.len(),
            edge_keys = self.edge.keys.len(),
            "property.provider.built"
        );
        PropertyProvider {
            vertex_labeller: self
                .vertex_labeller
                .unwrap_or_else(|| Box::new(|_| DEFAULT_VERTEX_LABEL.to_owned())),
            edge_labeller: self
                .edge_labeller
                .unwrap_or_else(|| Box::new(|_, _| DEFAULT_EDGE_LABEL.to_owned())),
            vertex: self.vertex,
            edge: self.edge,
            released: false,
        }
    }
}

impl fmt::Debug for PropertyProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyProviderBuilder")
            .field("vertex_keys", &self.vertex.keys)
            .field("edge_keys", &self.edge.keys)
            .field("custom_vertex_labeller", &self.vertex_labeller.is_some())
            .field("custom_edge_labeller", &self.edge_labeller.is_some())
            .finish()
    }
}

/// Read-only source of labels and property values.
pub struct PropertyProvider {
    vertex_labeller: VertexLabeller,
    edge_labeller: EdgeLabeller,
    vertex: Registry<VertexCodec>,
    edge: Registry<EdgeCodec>,
    released: bool,
}

impl PropertyProvider {
    /// Shorthand for [`PropertyProviderBuilder::new`].
    pub fn builder() -> PropertyProviderBuilder {
        PropertyProviderBuilder::new()
    }

    /// Label of `node`.
    pub fn vertex_label(&self, node: NodeId) -> String {
        (self.vertex_labeller)(node)
    }

    /// Keys registered for vertices, in registration order. The same set
    /// applies to every node.
    pub fn vertex_property_keys(&self, _node: NodeId) -> &[Arc<str>] {
        &self.vertex.keys
    }

    /// Unknown keys resolve to `None`.
    pub fn vertex_property(&self, key: &str, node: NodeId) -> Result<Option<PropValue>> {
        match self.vertex.get(key) {
            Some(codec) => codec.get(node),
            None => Ok(None),
        }
    }

    /// Label of the arc `from -> to`.
    pub fn edge_label(&self, from: NodeId, to: NodeId) -> String {
        (self.edge_labeller)(from, to)
    }

    /// Keys registered for edges, in registration order.
    pub fn edge_property_keys(&self, _from: NodeId, _to: NodeId) -> &[Arc<str>] {
        &self.edge.keys
    }

    /// Unknown keys resolve to `None`.
    pub fn edge_property(&self, key: &str, from: NodeId, to: NodeId) -> Result<Option<PropValue>> {
        match self.edge.get(key) {
            Some(codec) => codec.get(from, to),
            None => Ok(None),
        }
    }

    /// Whether `key` is registered for vertices.
    pub fn has_vertex_property(&self, key: &str) -> bool {
        self.vertex.get(key).is_some()
    }

    /// Whether `key` is registered for edges.
    pub fn has_edge_property(&self, key: &str) -> bool {
        self.edge.get(key).is_some()
    }

    /// Unmaps every file-backed codec. Later reads through those codecs fail
    /// with [`GraphError::Closed`]; computed codecs keep working.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        for codec in &mut self.vertex.codecs {
            codec.release();
        }
        self.released = true;
    }

    /// Whether [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl fmt::Debug for PropertyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyProvider")
            .field("vertex_keys", &self.vertex.keys)
            .field("edge_keys", &self.edge.keys)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i64) -> VertexCodec {
        VertexCodec::computed(move |_| Ok(Some(PropValue::Int(value))))
    }

    #[test]
    fn default_labels() {
        let provider = PropertyProvider::builder().build();
        assert_eq!(provider.vertex_label(NodeId(3)), "vertex");
        assert_eq!(provider.edge_label(NodeId(3), NodeId(4)), "edge");
    }

    #[test]
    fn custom_labellers_are_used() {
        let provider = PropertyProvider::builder()
            .vertex_labeller(|node| if node.0 % 2 == 0 { "rev" } else { "dir" }.to_owned())
            .edge_labeller(|from, to| format!("{from}->{to}"))
            .build();
        assert_eq!(provider.vertex_label(NodeId(2)), "rev");
        assert_eq!(provider.vertex_label(NodeId(1)), "dir");
        assert_eq!(provider.edge_label(NodeId(1), NodeId(2)), "1->2");
    }

    #[test]
    fn keys_keep_registration_order() -> Result<()> {
        let provider = PropertyProvider::builder()
            .vertex_property("zeta", constant(1))?
            .vertex_property("alpha", constant(2))?
            .vertex_property("mid", constant(3))?
            .build();
        let keys: Vec<&str> = provider
            .vertex_property_keys(NodeId(0))
            .iter()
            .map(|k| &**k)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        Ok(())
    }

    #[test]
    fn duplicate_vertex_key_fails() -> Result<()> {
        let builder = PropertyProvider::builder().vertex_property("ts", constant(1))?;
        match builder.vertex_property("ts", constant(2)) {
            Err(GraphError::DuplicateKey { scope, key }) => {
                assert_eq!(scope, KeyScope::Vertex);
                assert_eq!(key, "ts");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("duplicate key must fail"),
        }
        Ok(())
    }

    #[test]
    fn vertex_and_edge_keys_are_separate_namespaces() -> Result<()> {
        let provider = PropertyProvider::builder()
            .vertex_property("weight", constant(1))?
            .edge_property("weight", EdgeCodec::computed(|_, _| Ok(Some(PropValue::Int(2)))))?
            .build();
        assert_eq!(
            provider.vertex_property("weight", NodeId(0))?,
            Some(PropValue::Int(1))
        );
        assert_eq!(
            provider.edge_property("weight", NodeId(0), NodeId(1))?,
            Some(PropValue::Int(2))
        );
        Ok(())
    }

    #[test]
    fn unknown_key_is_absent() -> Result<()> {
        let provider = PropertyProvider::builder().build();
        assert_eq!(provider.vertex_property("nope", NodeId(0))?, None);
        assert_eq!(provider.edge_property("nope", NodeId(0), NodeId(1))?, None);
        Ok(())
    }

    #[test]
    fn merge_rejects_colliding_keys() -> Result<()> {
        let left = PropertyProvider::builder().edge_property(
            "label",
            EdgeCodec::computed(|_, _| Ok(None)),
        )?;
        let right = PropertyProvider::builder().edge_property(
            "label",
            EdgeCodec::computed(|_, _| Ok(None)),
        )?;
        assert!(matches!(
            left.merge(right),
            Err(GraphError::DuplicateKey {
                scope: KeyScope::Edge,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn merge_appends_registrations_and_fills_labellers() -> Result<()> {
        let left = PropertyProvider::builder().vertex_property("a", constant(1))?;
        let right = PropertyProvider::builder()
            .vertex_labeller(|_| "rev".to_owned())
            .vertex_property("b", constant(2))?;
        let provider = left.merge(right)?.build();
        let keys: Vec<&str> = provider
            .vertex_property_keys(NodeId(0))
            .iter()
            .map(|k| &**k)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(provider.vertex_label(NodeId(0)), "rev");
        Ok(())
    }

    #[test]
    fn provider_is_deterministic() -> Result<()> {
        let provider = PropertyProvider::builder()
            .vertex_property(
                "double",
                VertexCodec::computed(|node| Ok(Some(PropValue::Int(node.0 as i64 * 2)))),
            )?
            .build();
        for node in 0..16 {
            let first = provider.vertex_property("double", NodeId(node))?;
            let second = provider.vertex_property("double", NodeId(node))?;
            assert_eq!(first, second);
        }
        Ok(())
    }

    #[test]
    fn builder_debug_lists_keys() -> Result<()> {
        let builder = PropertyProvider::builder()
            .vertex_property("size", constant(1))?
            .edge_property("weight", EdgeCodec::computed(|_, _| Ok(None)))?;
        let rendered = format!("{builder:?}");
        assert!(rendered.contains("\"size\""), "{rendered}");
        assert!(rendered.contains("\"weight\""), "{rendered}");
        let err = builder.vertex_property("size", constant(2)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateKey { .. }));
        Ok(())
    }

    #[test]
    fn registration_is_reported_per_scope() -> Result<()> {
        let provider = PropertyProvider::builder()
            .vertex_property("size", constant(1))?
            .edge_property("weight", EdgeCodec::computed(|_, _| Ok(None)))?
            .build();
        assert!(provider.has_vertex_property("size"));
        assert!(!provider.has_vertex_property("weight"));
        assert!(provider.has_edge_property("weight"));
        assert!(!provider.has_edge_property("size"));
        Ok(())
    }
}
