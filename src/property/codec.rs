//! Per-key value sources: computed closures, mapped files and arc labels.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{GraphError, Result};
use crate::property::arc_label::{ArcLabelProperty, ArcLabelSubProperty};
use crate::property::file::{FixedNumericFile, TextFile};
use crate::types::{NodeId, PropValue};

/// Closure backing a computed vertex property.
pub type VertexFn = dyn Fn(NodeId) -> Result<Option<PropValue>> + Send + Sync;
/// Closure backing a computed edge property.
pub type EdgeFn = dyn Fn(NodeId, NodeId) -> Result<Option<PropValue>> + Send + Sync;

/// Value types a property can be declared with.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    /// `PropValue::Bool`.
    Bool,
    /// `PropValue::Int`; file-backed as fixed numeric.
    Int,
    /// `PropValue::Float`.
    Float,
    /// `PropValue::Str`; file-backed as text.
    Text,
    /// `PropValue::Bytes`.
    Bytes,
    /// `PropValue::List`.
    List,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
            ValueType::List => "list",
        };
        f.write_str(name)
    }
}

/// How a vertex property value is resolved from a node id.
pub enum VertexCodec {
    /// Evaluated on every uncached read.
    Computed(Box<VertexFn>),
    /// One signed 64-bit record per node.
    FixedNumeric(FixedNumericFile),
    /// Length-prefixed UTF-8 text per node.
    Text(TextFile),
}

impl VertexCodec {
    /// Wraps `f` as a computed codec.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(NodeId) -> Result<Option<PropValue>> + Send + Sync + 'static,
    {
        VertexCodec::Computed(Box::new(f))
    }

    /// Maps a fixed numeric file.
    pub fn fixed_numeric(path: impl AsRef<Path>) -> Result<Self> {
        FixedNumericFile::open(path).map(VertexCodec::FixedNumeric)
    }

    /// Maps a text buffer and its offsets file.
    pub fn text(buffer_path: impl AsRef<Path>, offsets_path: impl AsRef<Path>) -> Result<Self> {
        TextFile::open(buffer_path, offsets_path).map(VertexCodec::Text)
    }

    /// Opens the file-backed codec for `value_type`: `Int` maps a fixed
    /// numeric file at `path`, `Text` maps the buffer at `path` with its
    /// offsets at [`text_offsets_path`]. Other types have no file layout and
    /// are rejected here, before any provider exists.
    pub fn open_file(value_type: ValueType, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match value_type {
            ValueType::Int => Self::fixed_numeric(path),
            ValueType::Text => Self::text(path, text_offsets_path(path)),
            other => Err(GraphError::InvalidConfig(format!(
                "no file-backed codec for {other} properties"
            ))),
        }
    }

    /// Value for `node`; `None` when the node has none.
    pub fn get(&self, node: NodeId) -> Result<Option<PropValue>> {
        match self {
            VertexCodec::Computed(f) => f(node),
            VertexCodec::FixedNumeric(file) => Ok(file.get(node.0)?.map(PropValue::Int)),
            VertexCodec::Text(file) => file.get(node.0).map(|text| Some(PropValue::Str(text))),
        }
    }

    /// Short name used in logs and `Debug` output.
    pub fn kind(&self) -> &'static str {
        match self {
            VertexCodec::Computed(_) => "computed",
            VertexCodec::FixedNumeric(_) => "fixed-numeric",
            VertexCodec::Text(_) => "text",
        }
    }

    pub(crate) fn release(&mut self) {
        match self {
            VertexCodec::Computed(_) => {}
            VertexCodec::FixedNumeric(file) => file.release(),
            VertexCodec::Text(file) => file.release(),
        }
    }
}

impl fmt::Debug for VertexCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VertexCodec").field(&self.kind()).finish()
    }
}

/// Companion offsets file of a text property buffer (`<buffer>.offsets`).
pub fn text_offsets_path(buffer_path: &Path) -> PathBuf {
    let mut raw = buffer_path.as_os_str().to_owned();
    raw.push(".offsets");
    PathBuf::from(raw)
}

/// How an edge property value is resolved from an ordered node pair.
pub enum EdgeCodec {
    /// Evaluated on every uncached read.
    Computed(Box<EdgeFn>),
    /// The whole arc label.
    ArcLabel(ArcLabelProperty),
    /// A value extracted from the arc label.
    ArcLabelSub(ArcLabelSubProperty),
}

impl EdgeCodec {
    /// Wraps `f` as a computed codec.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(NodeId, NodeId) -> Result<Option<PropValue>> + Send + Sync + 'static,
    {
        EdgeCodec::Computed(Box::new(f))
    }

    /// Value for the edge `from -> to`.
    pub fn get(&self, from: NodeId, to: NodeId) -> Result<Option<PropValue>> {
        match self {
            EdgeCodec::Computed(f) => f(from, to),
            EdgeCodec::ArcLabel(property) => Ok(property.get(from, to)),
            EdgeCodec::ArcLabelSub(property) => Ok(property.get(from, to)),
        }
    }

    /// Short name used in logs and `Debug` output.
    pub fn kind(&self) -> &'static str {
        match self {
            EdgeCodec::Computed(_) => "computed",
            EdgeCodec::ArcLabel(_) => "arc-label",
            EdgeCodec::ArcLabelSub(_) => "arc-label-sub",
        }
    }
}

impl fmt::Debug for EdgeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EdgeCodec").field(&self.kind()).finish()
    }
}

impl From<ArcLabelProperty> for EdgeCodec {
    fn from(value: ArcLabelProperty) -> Self {
        EdgeCodec::ArcLabel(value)
    }
}

impl From<ArcLabelSubProperty> for EdgeCodec {
    fn from(value: ArcLabelSubProperty) -> Self {
        EdgeCodec::ArcLabelSub(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::file::{write_fixed_numeric, write_text};
    use tempfile::tempdir;

    #[test]
    fn computed_codec_passes_node_through() -> Result<()> {
        let codec = VertexCodec::computed(|node| Ok(Some(PropValue::Int(node.0 as i64 * 10))));
        assert_eq!(codec.get(NodeId(4))?, Some(PropValue::Int(40)));
        assert_eq!(codec.kind(), "computed");
        Ok(())
    }

    #[test]
    fn open_file_dispatches_on_value_type() -> Result<()> {
        let dir = tempdir()?;
        let numeric = dir.path().join("g.property.ts.bin");
        write_fixed_numeric(&numeric, [3])?;
        let codec = VertexCodec::open_file(ValueType::Int, &numeric)?;
        assert_eq!(codec.get(NodeId(0))?, Some(PropValue::Int(3)));

        let text = dir.path().join("g.property.msg.bin");
        write_text(&text, text_offsets_path(&text), ["hi"])?;
        let codec = VertexCodec::open_file(ValueType::Text, &text)?;
        assert_eq!(codec.get(NodeId(0))?, Some(PropValue::from("hi")));
        Ok(())
    }

    #[test]
    fn open_file_rejects_types_without_layout() {
        let err = VertexCodec::open_file(ValueType::Float, "unused.bin").unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig(msg) if msg.contains("float")));
    }

    #[test]
    fn offsets_path_appends_suffix() {
        assert_eq!(
            text_offsets_path(Path::new("/g/graph.message.bin")),
            PathBuf::from("/g/graph.message.bin.offsets")
        );
    }

    #[test]
    fn computed_edge_codec_sees_both_endpoints() -> Result<()> {
        let codec = EdgeCodec::computed(|from, to| Ok(Some(PropValue::Int((from.0 + to.0) as i64))));
        assert_eq!(codec.get(NodeId(2), NodeId(5))?, Some(PropValue::Int(7)));
        Ok(())
    }
}
