//! ConstraintSet - structural limits on enumerated patterns

use thiserror::Error;
use tracing::debug;

use crate::grid::{GridError, GridGraph, NodeId};

/// Configuration-time constraint errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),
}

fn invalid(reason: impl Into<String>) -> ConstraintError {
    ConstraintError::InvalidConstraint(reason.into())
}

/// Prefix, suffix, exclusions and length bounds for enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    /// Leading nodes every pattern must start with
    pub prefix: Vec<String>,

    /// Trailing nodes every pattern must end with
    pub suffix: Vec<String>,

    /// Nodes that may never appear
    pub excluded: Vec<String>,

    /// Inclusive lower bound on pattern length
    pub min_length: usize,

    /// Inclusive upper bound on pattern length
    pub max_length: usize,
}

impl ConstraintSet {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            prefix: Vec::new(),
            suffix: Vec::new(),
            excluded: Vec::new(),
            min_length,
            max_length,
        }
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: impl IntoIterator<Item = S>) -> Self {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_suffix<S: Into<String>>(mut self, suffix: impl IntoIterator<Item = S>) -> Self {
        self.suffix = suffix.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded<S: Into<String>>(mut self, excluded: impl IntoIterator<Item = S>) -> Self {
        self.excluded = excluded.into_iter().map(Into::into).collect();
        self
    }

    /// Validate against `graph` and lower labels to node ids
    ///
    /// Catches every mistake that would otherwise surface deep into a run:
    /// unknown nodes, inconsistent bounds, excluded nodes in the prefix or
    /// suffix, and a prefix/suffix pair that cannot share one pattern.
    /// A prefix that is not a connected chain is NOT rejected here; it
    /// enumerates nothing. Use [`ConstraintSet::check_reachable`] to reject
    /// it explicitly.
    pub fn resolve(&self, graph: &GridGraph) -> Result<ResolvedConstraints, ConstraintError> {
        debug!(?self, "ConstraintSet::resolve: called");
        let node_count = graph.node_count();

        if self.min_length < 1 || self.max_length < 1 {
            return Err(invalid("path lengths must be at least 1"));
        }
        if self.min_length > self.max_length {
            return Err(invalid(format!(
                "min length ({}) exceeds max length ({})",
                self.min_length, self.max_length
            )));
        }
        if self.max_length > node_count {
            return Err(invalid(format!(
                "max length ({}) exceeds the {} nodes of the grid",
                self.max_length, node_count
            )));
        }

        let prefix = resolve_labels(graph, &self.prefix)?;
        let suffix = resolve_labels(graph, &self.suffix)?;
        let excluded_ids = resolve_labels(graph, &self.excluded)?;
        let excluded = excluded_ids.iter().fold(0u64, |mask, &id| mask | bit(id));

        for (name, part, labels) in [("prefix", &prefix, &self.prefix), ("suffix", &suffix, &self.suffix)] {
            if part.len() > self.max_length {
                return Err(invalid(format!(
                    "{} length ({}) exceeds max length ({})",
                    name,
                    part.len(),
                    self.max_length
                )));
            }
            if let Some(pos) = part.iter().position(|&id| excluded & bit(id) != 0) {
                return Err(invalid(format!("{} contains excluded node '{}'", name, labels[pos])));
            }
            if !is_distinct(part) {
                return Err(invalid(format!("{} repeats a node", name)));
            }
        }

        if shortest_join(&prefix, &suffix).is_none_or(|len| len > self.max_length) {
            return Err(invalid(format!(
                "prefix {:?} and suffix {:?} cannot both fit in a pattern of at most {} nodes",
                self.prefix, self.suffix, self.max_length
            )));
        }

        Ok(ResolvedConstraints {
            prefix,
            suffix,
            excluded,
            min_length: self.min_length,
            max_length: self.max_length,
        })
    }

    /// Explicit check that prefix and suffix are connected chains
    pub fn check_reachable(&self, graph: &GridGraph) -> Result<(), ConstraintError> {
        debug!("ConstraintSet::check_reachable: called");
        let resolved = self.resolve(graph)?;
        for (name, part) in [("prefix", &resolved.prefix), ("suffix", &resolved.suffix)] {
            if let Some(w) = part.windows(2).find(|w| !graph.is_adjacent(w[0], w[1])) {
                return Err(invalid(format!(
                    "{} steps from '{}' to '{}', which are not adjacent",
                    name,
                    graph.label(w[0]),
                    graph.label(w[1])
                )));
            }
        }
        Ok(())
    }
}

/// Constraints lowered to node ids for the enumerator
#[derive(Debug, Clone)]
pub struct ResolvedConstraints {
    pub(crate) prefix: Vec<NodeId>,
    pub(crate) suffix: Vec<NodeId>,
    pub(crate) excluded: u64,
    pub(crate) min_length: usize,
    pub(crate) max_length: usize,
}

pub(crate) fn bit(id: NodeId) -> u64 {
    1u64 << id
}

fn resolve_labels(graph: &GridGraph, labels: &[String]) -> Result<Vec<NodeId>, GridError> {
    labels.iter().map(|label| graph.node_id(label)).collect()
}

fn is_distinct(ids: &[NodeId]) -> bool {
    let mut seen = 0u64;
    for &id in ids {
        if seen & bit(id) != 0 {
            return false;
        }
        seen |= bit(id);
    }
    true
}

/// Length of the shortest node-distinct sequence that starts with `prefix`
/// and ends with `suffix` (the two may overlap)
fn shortest_join(prefix: &[NodeId], suffix: &[NodeId]) -> Option<usize> {
    let max_overlap = prefix.len().min(suffix.len());
    (0..=max_overlap).rev().find_map(|k| {
        if prefix[prefix.len() - k..] != suffix[..k] {
            return None;
        }
        let mut joined = prefix.to_vec();
        joined.extend_from_slice(&suffix[k..]);
        is_distinct(&joined).then_some(joined.len())
    })
}
