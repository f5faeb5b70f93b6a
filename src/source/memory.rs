//! In-memory CSR implementation of the source contracts.

use crate::error::{GraphError, Result};
use crate::source::{CompressedGraph, LabelledArcIter, LabelledGraph, LazyNodeIter, END_OF_LIST};
use crate::types::{NodeId, PropValue};

/// Compressed-sparse-row graph held in memory, with a transposed copy for
/// backward lookups and optional labels aligned with the forward arcs.
///
/// Successor and predecessor lists are sorted ascending, matching the native
/// order of the on-disk compressed formats. Parallel arcs are kept.
#[derive(Clone, Debug)]
pub struct MemoryGraph {
    num_nodes: u64,
    fwd_offsets: Vec<usize>,
    fwd_targets: Vec<u64>,
    fwd_labels: Option<Vec<PropValue>>,
    rev_offsets: Vec<usize>,
    rev_targets: Vec<u64>,
}

impl MemoryGraph {
    /// Builds both directions from `(from, to)` pairs. Endpoints must be
    /// below `num_nodes`.
    pub fn from_arcs(num_nodes: u64, arcs: &[(u64, u64)]) -> Result<Self> {
        let labelled: Vec<(u64, u64, Option<PropValue>)> =
            arcs.iter().map(|&(from, to)| (from, to, None)).collect();
        Self::build(num_nodes, labelled, false)
    }

    /// Like [`from_arcs`](Self::from_arcs), with one label per arc.
    pub fn from_labelled_arcs(num_nodes: u64, arcs: Vec<(u64, u64, PropValue)>) -> Result<Self> {
        let labelled = arcs
            .into_iter()
            .map(|(from, to, label)| (from, to, Some(label)))
            .collect();
        Self::build(num_nodes, labelled, true)
    }

    fn build(
        num_nodes: u64,
        mut arcs: Vec<(u64, u64, Option<PropValue>)>,
        keep_labels: bool,
    ) -> Result<Self> {
        if num_nodes == END_OF_LIST {
            return Err(GraphError::InvalidConfig(
                "node count collides with the end-of-list sentinel".into(),
            ));
        }
        let n = usize::try_from(num_nodes).map_err(|_| {
            GraphError::InvalidConfig(format!("{num_nodes} nodes exceed addressable memory"))
        })?;
        for &(from, to, _) in &arcs {
            for id in [from, to] {
                if id >= num_nodes {
                    return Err(GraphError::InvalidId { id, num_nodes });
                }
            }
        }
        arcs.sort_by_key(|&(from, to, _)| (from, to));

        let mut fwd_offsets = vec![0usize; n + 1];
        let mut rev_offsets = vec![0usize; n + 1];
        for &(from, to, _) in &arcs {
            fwd_offsets[from as usize + 1] += 1;
            rev_offsets[to as usize + 1] += 1;
        }
        for idx in 0..n {
            fwd_offsets[idx + 1] += fwd_offsets[idx];
            rev_offsets[idx + 1] += rev_offsets[idx];
        }

        let mut rev_targets = vec![0u64; arcs.len()];
        let mut rev_cursor = rev_offsets.clone();
        // Forward arcs are sorted by tail, so each head receives its tails in
        // ascending order.
        for &(from, to, _) in &arcs {
            let slot = &mut rev_cursor[to as usize];
            rev_targets[*slot] = from;
            *slot += 1;
        }

        let mut fwd_targets = Vec::with_capacity(arcs.len());
        let mut fwd_labels = keep_labels.then(|| Vec::with_capacity(arcs.len()));
        for (_, to, label) in arcs {
            fwd_targets.push(to);
            if let (Some(labels), Some(label)) = (fwd_labels.as_mut(), label) {
                labels.push(label);
            }
        }

        Ok(Self {
            num_nodes,
            fwd_offsets,
            fwd_targets,
            fwd_labels,
            rev_offsets,
            rev_targets,
        })
    }

    /// Number of forward arcs, parallel arcs included.
    pub fn num_arcs(&self) -> u64 {
        self.fwd_targets.len() as u64
    }

    fn fwd_range(&self, node: NodeId) -> std::ops::Range<usize> {
        range_of(&self.fwd_offsets, node)
    }

    fn rev_range(&self, node: NodeId) -> std::ops::Range<usize> {
        range_of(&self.rev_offsets, node)
    }
}

fn range_of(offsets: &[usize], node: NodeId) -> std::ops::Range<usize> {
    match usize::try_from(node.0) {
        Ok(idx) if idx + 1 < offsets.len() => offsets[idx]..offsets[idx + 1],
        _ => 0..0,
    }
}

/// Cursor over a slice of a CSR target array.
pub struct SliceNodes<'a> {
    ids: &'a [u64],
    pos: usize,
}

impl<'a> SliceNodes<'a> {
    fn new(ids: &'a [u64]) -> Self {
        Self { ids, pos: 0 }
    }
}

impl LazyNodeIter for SliceNodes<'_> {
    fn next_node(&mut self) -> u64 {
        match self.ids.get(self.pos) {
            Some(&id) => {
                self.pos += 1;
                id
            }
            None => END_OF_LIST,
        }
    }
}

struct LabelledSlice<'a> {
    ids: &'a [u64],
    labels: Option<&'a [PropValue]>,
    pos: usize,
}

impl LazyNodeIter for LabelledSlice<'_> {
    fn next_node(&mut self) -> u64 {
        match self.ids.get(self.pos) {
            Some(&id) => {
                self.pos += 1;
                id
            }
            None => END_OF_LIST,
        }
    }
}

impl LabelledArcIter for LabelledSlice<'_> {
    fn label(&self) -> Option<&PropValue> {
        let idx = self.pos.checked_sub(1)?;
        self.labels.and_then(|labels| labels.get(idx))
    }
}

impl CompressedGraph for MemoryGraph {
    type Successors<'a> = SliceNodes<'a>;
    type Predecessors<'a> = SliceNodes<'a>;

    fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    fn successors(&self, node: NodeId) -> Self::Successors<'_> {
        SliceNodes::new(&self.fwd_targets[self.fwd_range(node)])
    }

    fn predecessors(&self, node: NodeId) -> Self::Predecessors<'_> {
        SliceNodes::new(&self.rev_targets[self.rev_range(node)])
    }
}

impl LabelledGraph for MemoryGraph {
    fn labelled_successors(&self, node: NodeId) -> Box<dyn LabelledArcIter + '_> {
        let range = self.fwd_range(node);
        Box::new(LabelledSlice {
            ids: &self.fwd_targets[range.clone()],
            labels: self.fwd_labels.as_deref().map(|labels| &labels[range]),
            pos: 0,
        })
    }
}
