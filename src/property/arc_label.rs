//! Edge properties read from the labels attached to forward arcs.
//!
//! A lookup for `(from, to)` rescans the successor list of `from` until it
//! reaches `to`, so each call costs O(out-degree(from)). A traversal that
//! reads several sub-properties of every edge it crosses pays that scan once
//! per sub-property per edge; the handle-level memo only removes repeats on
//! the same handle.

use std::fmt;
use std::sync::Arc;

use crate::source::{LabelledGraph, END_OF_LIST};
use crate::types::{NodeId, PropValue};

/// The full label of an arc.
#[derive(Clone)]
pub struct ArcLabelProperty {
    graph: Arc<dyn LabelledGraph>,
}

impl ArcLabelProperty {
    /// Reads labels from `graph`.
    pub fn new(graph: Arc<dyn LabelledGraph>) -> Self {
        Self { graph }
    }

    /// Label of the first arc `from -> to`, or `None` when `to` is not a
    /// successor of `from` or the arc carries no label.
    pub fn get(&self, from: NodeId, to: NodeId) -> Option<PropValue> {
        let mut arcs = self.graph.labelled_successors(from);
        loop {
            match arcs.next_node() {
                END_OF_LIST => return None,
                succ if succ == to.0 => return arcs.label().cloned(),
                _ => {}
            }
        }
    }

    /// Derives a property from this label through `extract`.
    pub fn sub_property<F>(&self, extract: F) -> ArcLabelSubProperty
    where
        F: Fn(&PropValue) -> Option<PropValue> + Send + Sync + 'static,
    {
        ArcLabelSubProperty {
            base: self.clone(),
            extract: Box::new(extract),
        }
    }
}

impl fmt::Debug for ArcLabelProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcLabelProperty").finish_non_exhaustive()
    }
}

type Extractor = dyn Fn(&PropValue) -> Option<PropValue> + Send + Sync;

/// A value computed from an arc label. Holds its base property directly,
/// so it never depends on the key the base is registered under.
pub struct ArcLabelSubProperty {
    base: ArcLabelProperty,
    extract: Box<Extractor>,
}

impl ArcLabelSubProperty {
    /// Extracted value, or `None` when the arc or the extraction yields nothing.
    pub fn get(&self, from: NodeId, to: NodeId) -> Option<PropValue> {
        let label = self.base.get(from, to)?;
        (self.extract)(&label)
    }
}

impl fmt::Debug for ArcLabelSubProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcLabelSubProperty").finish_non_exhaustive()
    }
}
