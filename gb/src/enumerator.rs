//! PathEnumerator - depth-first, backtracking pattern producer
//!
//! The search is an explicit state machine rather than recursion: one path
//! buffer, one neighbour cursor per path position, and a `u64` visited mask.
//! Extending the path pushes onto the buffer and backtracking pops from it;
//! the buffer is never copied while searching. Each call to `next()` resumes
//! the walk where the previous one stopped and runs until the next pattern
//! that satisfies the constraints.
//!
//! Emission order is the preorder of the search tree: a pattern is produced
//! before any of its extensions, and siblings follow the grid's neighbour
//! order. Resumption relies on this order being stable.

use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::debug;

use crate::constraints::{ConstraintError, ConstraintSet, ResolvedConstraints, bit};
use crate::grid::{GridGraph, NodeId};
use crate::pattern::Pattern;

/// Lazy, single-pass sequence of every pattern satisfying a constraint set
pub struct PathEnumerator {
    graph: Arc<GridGraph>,
    constraints: ResolvedConstraints,

    /// Current path (the single mutable buffer)
    path: Vec<NodeId>,

    /// Next neighbour index to try, one per path position
    cursors: Vec<usize>,

    /// Nodes on the current path
    visited: u64,

    /// Path positions below this belong to the fixed prefix and are never
    /// backtracked individually
    floor: usize,

    /// Next root candidate (node order when there is no prefix; 0/1 marks
    /// whether the prefix root has been used otherwise)
    next_root: usize,

    done: bool,
}

impl PathEnumerator {
    /// Create an enumerator; all constraint errors surface here
    pub fn new(graph: Arc<GridGraph>, constraints: &ConstraintSet) -> Result<Self, ConstraintError> {
        debug!(?constraints, "PathEnumerator::new: called");
        let constraints = constraints.resolve(&graph)?;
        let capacity = constraints.max_length;
        Ok(Self {
            graph,
            constraints,
            path: Vec::with_capacity(capacity),
            cursors: Vec::with_capacity(capacity),
            visited: 0,
            floor: 0,
            next_root: 0,
            done: false,
        })
    }

    pub fn graph(&self) -> &Arc<GridGraph> {
        &self.graph
    }

    /// Count the patterns not yet produced, without materialising them
    pub fn count_remaining(mut self) -> u64 {
        debug!("PathEnumerator::count_remaining: called");
        let mut count = 0u64;
        while self.advance() {
            count += 1;
        }
        debug!(count, "PathEnumerator::count_remaining: done");
        count
    }

    /// Step the search to the next emitting position
    fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        loop {
            if self.path.is_empty() {
                if !self.start_root() {
                    self.done = true;
                    return false;
                }
            } else if !self.descend() {
                self.backtrack();
                continue;
            }
            if self.emits() {
                return true;
            }
        }
    }

    /// Seed the path with the next root: the whole prefix, or the next
    /// non-excluded node in graph order
    fn start_root(&mut self) -> bool {
        let prefix_len = self.constraints.prefix.len();
        if prefix_len > 0 {
            if self.next_root > 0 {
                return false;
            }
            self.next_root = 1;
            for i in 0..prefix_len {
                let id = self.constraints.prefix[i];
                let connected = i == 0 || self.graph.is_adjacent(self.constraints.prefix[i - 1], id);
                if !connected || !self.allowed(id) {
                    debug!(position = i, "PathEnumerator::start_root: prefix is not a simple chain");
                    self.reset();
                    return false;
                }
                self.push(id);
            }
            self.floor = prefix_len;
            return true;
        }

        while self.next_root < self.graph.node_count() {
            let id = self.next_root as NodeId;
            self.next_root += 1;
            if self.allowed(id) {
                self.push(id);
                self.floor = 1;
                return true;
            }
        }
        false
    }

    /// Extend the path by the next usable neighbour of its last node
    fn descend(&mut self) -> bool {
        if self.path.len() >= self.constraints.max_length {
            return false;
        }
        let top = self.path.len() - 1;
        let neighbors = self.graph.neighbors(self.path[top]);
        while self.cursors[top] < neighbors.len() {
            let next = neighbors[self.cursors[top]];
            self.cursors[top] += 1;
            if (self.visited | self.constraints.excluded) & bit(next) == 0 {
                self.path.push(next);
                self.cursors.push(0);
                self.visited |= bit(next);
                return true;
            }
        }
        false
    }

    fn backtrack(&mut self) {
        if self.path.len() > self.floor {
            if let Some(id) = self.path.pop() {
                self.cursors.pop();
                self.visited &= !bit(id);
            }
        } else {
            // Root subtree exhausted
            self.reset();
        }
    }

    fn emits(&self) -> bool {
        self.path.len() >= self.constraints.min_length && self.path.ends_with(&self.constraints.suffix)
    }

    fn allowed(&self, id: NodeId) -> bool {
        (self.visited | self.constraints.excluded) & bit(id) == 0
    }

    fn push(&mut self, id: NodeId) {
        self.path.push(id);
        self.cursors.push(0);
        self.visited |= bit(id);
    }

    fn reset(&mut self) {
        self.path.clear();
        self.cursors.clear();
        self.visited = 0;
        self.floor = 0;
    }
}

impl Iterator for PathEnumerator {
    type Item = Pattern;

    fn next(&mut self) -> Option<Pattern> {
        if self.advance() {
            Some(Pattern::from_ids(&self.graph, &self.path))
        } else {
            None
        }
    }
}

impl FusedIterator for PathEnumerator {}
