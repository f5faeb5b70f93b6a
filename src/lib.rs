//! Read-only property-graph view over compressed immutable graphs.
//!
//! A [`GraphView`] exposes a [`CompressedGraph`](source::CompressedGraph) as
//! vertices, edges and properties for a generic traversal engine, without
//! materialising the graph. Properties come from a [`PropertyProvider`]
//! backed by computed functions, memory-mapped files or per-arc labels.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod property;
pub mod source;
pub mod traversal;
pub mod types;
pub mod view;

pub use config::{ConfigError, GraphConfig};
pub use error::{GraphError, KeyScope, Result, UnsupportedOp};
pub use property::{
    EdgeCodec, PropertyProvider, PropertyProviderBuilder, ValueType, VertexCodec,
};
pub use source::{CompressedGraph, LazyNodeIter, MemoryGraph, END_OF_LIST};
pub use types::{Direction, EdgeKey, ElementId, NodeId, PropValue};
pub use view::{Edge, EdgeProperty, GraphView, Vertex, VertexProperty};
