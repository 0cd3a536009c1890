//! Pattern - one brute-force candidate

use std::fmt;

use crate::grid::{GridGraph, NodeId};

/// An ordered, non-repeating, adjacency-respecting sequence of grid nodes
///
/// Patterns are values. The canonical key (labels concatenated) is what the
/// ledger stores and what the device is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    nodes: Vec<NodeId>,
    key: String,
}

impl Pattern {
    /// Build from node ids; the caller guarantees the ids belong to `graph`
    pub fn from_ids(graph: &GridGraph, nodes: &[NodeId]) -> Self {
        let key = nodes.iter().map(|&id| graph.label(id)).collect();
        Self {
            nodes: nodes.to_vec(),
            key,
        }
    }

    /// Build from labels, checking only that every label exists
    pub fn from_labels<S: AsRef<str>>(graph: &GridGraph, labels: &[S]) -> Result<Self, crate::grid::GridError> {
        let ids = labels
            .iter()
            .map(|label| graph.node_id(label.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_ids(graph, &ids))
    }

    /// Canonical key used for persistence and dedup
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node labels in order
    pub fn labels<'g>(&self, graph: &'g GridGraph) -> Vec<&'g str> {
        self.nodes.iter().map(|&id| graph.label(id)).collect()
    }

    /// Whether the pattern is a simple path over `graph`
    pub fn is_valid_on(&self, graph: &GridGraph) -> bool {
        let mut seen = 0u64;
        for (i, &id) in self.nodes.iter().enumerate() {
            if (id as usize) >= graph.node_count() || seen & (1 << id) != 0 {
                return false;
            }
            seen |= 1 << id;
            if i > 0 && !graph.is_adjacent(self.nodes[i - 1], id) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
