//! Ids, directions and property values shared by every layer.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::GraphError;

/// Dense vertex identifier in `[0, num_nodes)`, assigned by the compressed source.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

/// An edge is addressed by its ordered endpoint pair; parallel arcs collapse
/// onto a single key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EdgeKey {
    /// Tail of the arc.
    pub from: NodeId,
    /// Head of the arc.
    pub to: NodeId,
}

impl EdgeKey {
    /// Key for the arc `from -> to`.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl From<(u64, u64)> for EdgeKey {
    fn from((from, to): (u64, u64)) -> Self {
        EdgeKey::new(from, to)
    }
}

/// Which adjacency lists a neighbourhood query walks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Successors only.
    Out,
    /// Predecessors only.
    In,
    /// Successors, then predecessors.
    Both,
}

impl Direction {
    /// True for `Out` and `Both`.
    pub fn includes_out(self) -> bool {
        matches!(self, Direction::Out | Direction::Both)
    }

    /// True for `In` and `Both`.
    pub fn includes_in(self) -> bool {
        matches!(self, Direction::In | Direction::Both)
    }
}

/// Loosely typed element id as handed over by a traversal engine.
///
/// Vertex lookups accept only [`ElementId::Int`]; edge lookups accept only
/// [`ElementId::Pair`]. Anything else is rejected with
/// [`GraphError::InvalidIdType`](crate::GraphError::InvalidIdType).
#[derive(Clone, Debug, PartialEq)]
pub enum ElementId {
    /// Vertex id.
    Int(i64),
    /// Edge id as `(from, to)`.
    Pair(i64, i64),
    /// Never a valid id; kept so the rejection can name it.
    Float(f64),
    /// Never a valid id; kept so the rejection can name it.
    Text(String),
}

impl ElementId {
    /// Short name of the variant for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementId::Int(_) => "integer",
            ElementId::Pair(_, _) => "integer pair",
            ElementId::Float(_) => "float",
            ElementId::Text(_) => "text",
        }
    }
}

impl From<i64> for ElementId {
    fn from(value: i64) -> Self {
        ElementId::Int(value)
    }
}

fn signed(id: NodeId) -> Result<i64, GraphError> {
    i64::try_from(id.0).map_err(|_| GraphError::InvalidIdType {
        expected: "integer up to i64::MAX",
        found: "integer above i64::MAX",
    })
}

/// Fails for ids above `i64::MAX`, which have no signed representation.
impl TryFrom<NodeId> for ElementId {
    type Error = GraphError;

    fn try_from(value: NodeId) -> Result<Self, Self::Error> {
        signed(value).map(ElementId::Int)
    }
}

impl TryFrom<EdgeKey> for ElementId {
    type Error = GraphError;

    fn try_from(value: EdgeKey) -> Result<Self, Self::Error> {
        Ok(ElementId::Pair(signed(value.from)?, signed(value.to)?))
    }
}

impl From<(i64, i64)> for ElementId {
    fn from((from, to): (i64, i64)) -> Self {
        ElementId::Pair(from, to)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        ElementId::Text(value.to_owned())
    }
}

impl From<f64> for ElementId {
    fn from(value: f64) -> Self {
        ElementId::Float(value)
    }
}

/// Property value with owned data.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Owned byte vector.
    Bytes(Vec<u8>),
    /// Ordered list of values, used for composite arc labels.
    List(Vec<PropValue>),
}

impl PropValue {
    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The items, if this is a `List`.
    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Feeds a stable representation into `state`; floats hash by bit pattern.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        match self {
            PropValue::Bool(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            PropValue::Int(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            PropValue::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            PropValue::Str(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            PropValue::Bytes(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            PropValue::List(items) => {
                5u8.hash(state);
                items.len().hash(state);
                for item in items {
                    item.hash_into(state);
                }
            }
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Int(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Str(v) => write!(f, "{v}"),
            PropValue::Bytes(v) => write!(f, "bytes(len={})", v.len()),
            PropValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_owned())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}
