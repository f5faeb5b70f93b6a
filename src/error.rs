//! Error type shared by the whole crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Operations the view refuses because the underlying graph is immutable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnsupportedOp {
    /// Adding a vertex.
    VertexAddition,
    /// Removing a vertex.
    VertexRemoval,
    /// Adding an edge.
    EdgeAddition,
    /// Removing an edge.
    EdgeRemoval,
    /// Setting a vertex property.
    VertexPropertyMutation,
    /// Setting an edge property.
    EdgePropertyMutation,
    /// Removing any property.
    PropertyRemoval,
    /// Properties on vertex properties.
    MetaProperties,
    /// Transactions.
    Transactions,
    /// OLAP graph computer.
    GraphComputer,
    /// Graph-level variables.
    Variables,
}

impl UnsupportedOp {
    /// Human-readable name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            UnsupportedOp::VertexAddition => "vertex additions",
            UnsupportedOp::VertexRemoval => "vertex removal",
            UnsupportedOp::EdgeAddition => "edge additions",
            UnsupportedOp::EdgeRemoval => "edge removal",
            UnsupportedOp::VertexPropertyMutation => "vertex property mutation",
            UnsupportedOp::EdgePropertyMutation => "edge property mutation",
            UnsupportedOp::PropertyRemoval => "property removal",
            UnsupportedOp::MetaProperties => "meta-properties",
            UnsupportedOp::Transactions => "transactions",
            UnsupportedOp::GraphComputer => "graph computer",
            UnsupportedOp::Variables => "graph variables",
        }
    }
}

impl fmt::Display for UnsupportedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a property key belongs to the vertex or the edge registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeyScope {
    /// Vertex property registry.
    Vertex,
    /// Edge property registry.
    Edge,
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::Vertex => f.write_str("vertex"),
            KeyScope::Edge => f.write_str("edge"),
        }
    }
}

/// Everything that can go wrong while opening or reading a view.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A property file could not be opened or mapped.
    #[error("failed to open property file {path}: {source}")]
    PropertyFile {
        /// File that failed.
        path: PathBuf,
        /// Cause reported by the OS.
        source: io::Error,
    },
    /// A mutation or optional feature of the read-only graph was requested.
    #[error("{0} not supported: the graph is read-only")]
    Unsupported(UnsupportedOp),
    /// An element id of the wrong shape.
    #[error("invalid id type: expected {expected}, found {found}")]
    InvalidIdType {
        /// Accepted shape.
        expected: &'static str,
        /// Shape that was passed.
        found: &'static str,
    },
    /// A well-formed id outside `[0, num_nodes)`.
    #[error("invalid id {id}: graph has {num_nodes} nodes")]
    InvalidId {
        /// Offending id.
        id: u64,
        /// Node count of the graph.
        num_nodes: u64,
    },
    /// A property key registered twice in the same scope.
    #[error("{scope} property key already registered: {key}")]
    DuplicateKey {
        /// Registry the key was added to.
        scope: KeyScope,
        /// The repeated key.
        key: String,
    },
    /// Stored data is inconsistent with the graph or with itself.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// File-backed data was read after the view was closed.
    #[error("property storage has been released")]
    Closed,
    /// Rejected settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GraphError {
    /// Shorthand for [`GraphError::Unsupported`].
    pub fn unsupported(op: UnsupportedOp) -> Self {
        GraphError::Unsupported(op)
    }

    /// Shorthand for [`GraphError::PropertyFile`].
    pub fn property_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GraphError::PropertyFile {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a refused operation rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, GraphError::Unsupported(_))
    }
}
