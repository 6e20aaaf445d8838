//! Constraint graph.
//!
//! An undirected adjacency structure from type variables to the
//! constraints that mention them, so "every constraint touching variable
//! V" is O(degree of V) instead of O(all constraints). Nodes are created
//! lazily on first reference; the whole graph is cloned into solver
//! checkpoints (expression-scale, so the clone is cheap).

use crate::solver::constraint::ConstraintId;
use crate::solver::types::TypeVar;
use smallvec::SmallVec;

type EdgeList = SmallVec<[ConstraintId; 4]>;

/// Adjacency from type-variable index to mentioning constraints.
#[derive(Clone, Debug, Default)]
pub struct ConstraintGraph {
    edges: Vec<EdgeList>,
}

impl ConstraintGraph {
    pub fn new() -> ConstraintGraph {
        ConstraintGraph::default()
    }

    fn ensure_node(&mut self, var: TypeVar) {
        let index = var.index() as usize;
        if index >= self.edges.len() {
            self.edges.resize_with(index + 1, EdgeList::new);
        }
    }

    /// Record that `constraint` mentions each variable in `vars`.
    pub fn add_constraint(&mut self, constraint: ConstraintId, vars: &[TypeVar]) {
        for &var in vars {
            self.ensure_node(var);
            let list = &mut self.edges[var.index() as usize];
            if !list.contains(&constraint) {
                list.push(constraint);
            }
        }
    }

    /// The constraints mentioning `var`, in insertion order.
    pub fn constraints_mentioning(&self, var: TypeVar) -> &[ConstraintId] {
        self.edges
            .get(var.index() as usize)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Union of the constraints mentioning any of `vars`, deduplicated,
    /// in insertion order.
    pub fn gather(&self, vars: &[TypeVar]) -> Vec<ConstraintId> {
        let mut result = Vec::new();
        for &var in vars {
            for &c in self.constraints_mentioning(var) {
                if !result.contains(&c) {
                    result.push(c);
                }
            }
        }
        result
    }

    /// Fold the edge lists of `sources` into `target` after an
    /// equivalence-class merge, so re-activation by representative sees
    /// every constraint that mentioned either class.
    pub fn merge_nodes(&mut self, target: TypeVar, sources: &[TypeVar]) {
        self.ensure_node(target);
        let mut merged: EdgeList = EdgeList::new();
        for &source in sources {
            if (source.index() as usize) < self.edges.len() {
                for &c in &self.edges[source.index() as usize] {
                    if !merged.contains(&c) {
                        merged.push(c);
                    }
                }
            }
        }
        let list = &mut self.edges[target.index() as usize];
        for c in merged {
            if !list.contains(&c) {
                list.push(c);
            }
        }
    }

    /// Number of variable nodes created so far.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }
}
