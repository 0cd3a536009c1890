//! GridGraph - immutable node set with symmetric adjacency
//!
//! A grid is built once per run and shared read-only. Nodes are addressed
//! internally by dense [`NodeId`] indices so the enumerator can keep its
//! visited set in a single `u64`.

mod tables;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

/// Dense index of a node within its graph
pub type NodeId = u8;

/// Largest graph the enumerator's visited mask can address
pub const MAX_NODES: usize = 64;

/// Configuration-time graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Unsupported grid size: {0} (supported: 3, 4, 5, 6)")]
    InvalidGridSize(u32),

    #[error("Unknown node: '{0}'")]
    UnknownNode(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
}

/// Immutable grid description
#[derive(Debug, Clone)]
pub struct GridGraph {
    /// Node labels in deterministic node order
    labels: Vec<String>,

    /// Label -> id
    index: HashMap<String, NodeId>,

    /// Neighbours per node, in deterministic neighbour order
    adjacency: Vec<Vec<NodeId>>,

    /// Side length when the nodes form a square layout
    side: Option<u32>,
}

impl GridGraph {
    /// Build the lock-screen grid with `side` x `side` nodes
    pub fn build(side: u32) -> Result<Self, GridError> {
        debug!(side, "GridGraph::build: called");
        let table = tables::table_for(side).ok_or(GridError::InvalidGridSize(side))?;

        let rows: Vec<(String, Vec<String>)> = table
            .iter()
            .map(|(label, neighbors)| (label.to_string(), neighbors.chars().map(String::from).collect()))
            .collect();

        let mut graph = Self::from_adjacency(rows)?;
        graph.side = Some(side);
        Ok(graph)
    }

    /// Build a graph from `(node, neighbours)` rows
    ///
    /// Row order is the node order and each neighbour list keeps its given
    /// order. Fails unless adjacency is symmetric and every neighbour is a
    /// listed node. Labels are single characters so that concatenated
    /// labels stay unambiguous ledger keys.
    pub fn from_adjacency<L, N>(rows: impl IntoIterator<Item = (L, N)>) -> Result<Self, GridError>
    where
        L: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let rows: Vec<(String, Vec<String>)> = rows
            .into_iter()
            .map(|(label, neighbors)| (label.into(), neighbors.into_iter().map(Into::into).collect()))
            .collect();
        debug!(nodes = rows.len(), "GridGraph::from_adjacency: called");

        if rows.is_empty() {
            return Err(GridError::InvalidGraph("graph has no nodes".to_string()));
        }
        if rows.len() > MAX_NODES {
            return Err(GridError::InvalidGraph(format!(
                "{} nodes exceeds the limit of {}",
                rows.len(),
                MAX_NODES
            )));
        }

        let mut index = HashMap::with_capacity(rows.len());
        for (id, (label, _)) in rows.iter().enumerate() {
            if !is_key_label(label) {
                return Err(GridError::InvalidGraph(format!(
                    "node label '{}' must be a single character other than a comma or whitespace",
                    label
                )));
            }
            if index.insert(label.clone(), id as NodeId).is_some() {
                return Err(GridError::InvalidGraph(format!("duplicate node '{}'", label)));
            }
        }

        let mut adjacency = Vec::with_capacity(rows.len());
        for (label, neighbors) in &rows {
            let mut ids: Vec<NodeId> = Vec::with_capacity(neighbors.len());
            for neighbor in neighbors {
                let id = *index
                    .get(neighbor)
                    .ok_or_else(|| GridError::UnknownNode(neighbor.clone()))?;
                if neighbor == label {
                    return Err(GridError::InvalidGraph(format!("node '{}' lists itself", label)));
                }
                if ids.contains(&id) {
                    return Err(GridError::InvalidGraph(format!(
                        "node '{}' lists '{}' twice",
                        label, neighbor
                    )));
                }
                ids.push(id);
            }
            adjacency.push(ids);
        }

        for (a, neighbors) in adjacency.iter().enumerate() {
            for &b in neighbors {
                if !adjacency[b as usize].contains(&(a as NodeId)) {
                    return Err(GridError::InvalidGraph(format!(
                        "'{}' lists '{}' but not the reverse",
                        rows[a].0, rows[b as usize].0
                    )));
                }
            }
        }

        Ok(Self {
            labels: rows.into_iter().map(|(label, _)| label).collect(),
            index,
            adjacency,
            side: None,
        })
    }

    /// Neighbour labels of `node`, in enumeration order
    pub fn neighbors_of(&self, node: &str) -> Result<Vec<&str>, GridError> {
        let id = self.node_id(node)?;
        Ok(self.neighbors(id).iter().map(|&n| self.label(n)).collect())
    }

    /// Resolve a label to its id
    pub fn node_id(&self, node: &str) -> Result<NodeId, GridError> {
        self.index
            .get(node)
            .copied()
            .ok_or_else(|| GridError::UnknownNode(node.to_string()))
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        &self.adjacency[id as usize]
    }

    pub fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency[a as usize].contains(&b)
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.labels[id as usize]
    }

    /// All labels in node order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    /// Side length for square lock-screen grids, `None` for custom graphs
    pub fn side(&self) -> Option<u32> {
        self.side
    }
}

/// One character that can appear in a ledger key
fn is_key_label(label: &str) -> bool {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c != ',' && !c.is_whitespace(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle4() -> GridGraph {
        GridGraph::from_adjacency([
            ("1", vec!["2", "4"]),
            ("2", vec!["1", "3"]),
            ("3", vec!["2", "4"]),
            ("4", vec!["3", "1"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_sizes() {
        for (side, count) in [(3, 9), (4, 16), (5, 25), (6, 36)] {
            let graph = GridGraph::build(side).unwrap();
            assert_eq!(graph.node_count(), count);
            assert_eq!(graph.side(), Some(side));
        }
    }

    #[test]
    fn test_build_invalid_size() {
        assert_eq!(GridGraph::build(2).unwrap_err(), GridError::InvalidGridSize(2));
        assert_eq!(GridGraph::build(7).unwrap_err(), GridError::InvalidGridSize(7));
    }

    #[test]
    fn test_neighbors_of_3x3() {
        let graph = GridGraph::build(3).unwrap();
        assert_eq!(graph.neighbors_of("1").unwrap(), vec!["2", "4", "5"]);
        assert_eq!(graph.neighbors_of("5").unwrap().len(), 8);
        assert_eq!(graph.neighbors_of("9").unwrap(), vec!["5", "6", "8"]);
    }

    #[test]
    fn test_neighbors_of_4x4_uses_ascii_labels() {
        let graph = GridGraph::build(4).unwrap();
        assert_eq!(graph.neighbors_of("@").unwrap(), vec![";", "<", "?"]);
        assert!(graph.neighbors_of(":").unwrap().contains(&"5"));
    }

    #[test]
    fn test_unknown_node() {
        let graph = GridGraph::build(3).unwrap();
        assert_eq!(
            graph.neighbors_of("0").unwrap_err(),
            GridError::UnknownNode("0".to_string())
        );
        assert!(graph.node_id(":").is_err());
    }

    #[test]
    fn test_builtin_grids_are_symmetric() {
        for side in 3..=6 {
            let graph = GridGraph::build(side).unwrap();
            for a in 0..graph.node_count() as NodeId {
                for &b in graph.neighbors(a) {
                    assert!(graph.is_adjacent(b, a));
                }
            }
        }
    }

    #[test]
    fn test_from_adjacency_keeps_order() {
        let graph = cycle4();
        assert_eq!(graph.labels().collect::<Vec<_>>(), vec!["1", "2", "3", "4"]);
        assert_eq!(graph.neighbors_of("4").unwrap(), vec!["3", "1"]);
        assert_eq!(graph.side(), None);
    }

    #[test]
    fn test_from_adjacency_rejects_asymmetry() {
        let err = GridGraph::from_adjacency([("a", vec!["b"]), ("b", vec![])]).unwrap_err();
        assert!(matches!(err, GridError::InvalidGraph(_)));
    }

    #[test]
    fn test_from_adjacency_rejects_unknown_neighbor() {
        let err = GridGraph::from_adjacency([("a", vec!["z"])]).unwrap_err();
        assert_eq!(err, GridError::UnknownNode("z".to_string()));
    }

    #[test]
    fn test_from_adjacency_rejects_duplicates() {
        let err = GridGraph::from_adjacency([("a", vec!["b"]), ("a", vec!["b"]), ("b", vec!["a"])]).unwrap_err();
        assert!(matches!(err, GridError::InvalidGraph(_)));
    }

    #[test]
    fn test_from_adjacency_rejects_ambiguous_labels() {
        // "12" would make the key of [1, 2] collide with the key of [12]
        let err = GridGraph::from_adjacency([
            ("1", vec!["2", "12"]),
            ("2", vec!["1", "12"]),
            ("12", vec!["1", "2"]),
        ])
        .unwrap_err();
        assert!(matches!(err, GridError::InvalidGraph(_)));

        for label in ["", ",", " ", "\t"] {
            let err = GridGraph::from_adjacency([(label, Vec::<&str>::new())]).unwrap_err();
            assert!(matches!(err, GridError::InvalidGraph(_)), "accepted {:?}", label);
        }
    }

    #[test]
    fn test_from_adjacency_accepts_single_char_labels() {
        let graph = GridGraph::from_adjacency([("a", vec!["@"]), ("@", vec!["a"])]).unwrap();
        assert_eq!(graph.node_count(), 2);
    }
}
