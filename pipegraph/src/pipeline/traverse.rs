//! Breadth-first dependency order.

use std::collections::HashSet;

use tracing::trace;

use super::Pipeline;
use crate::errors::{PipegraphError, Result};
use crate::nodes::{Node, NodeId};

impl Pipeline {
    /// Visits the graph breadth-first from a root.
    ///
    /// Without `start` the pipeline must have exactly one root. A vertex is
    /// listed once, in the frontier where it is first reached.
    ///
    /// # Errors
    ///
    /// - `AmbiguousStart` when `start` is `None` and the root is not unique
    /// - `InvalidStart` when `start` is not a root
    pub fn traverse(&self, start: Option<NodeId>, plugins_only: bool) -> Result<Vec<NodeId>> {
        let roots = self.graph.roots();
        let start = match start {
            Some(id) if roots.contains(&id) => id,
            Some(id) => return Err(PipegraphError::InvalidStart(id)),
            None => match roots.as_slice() {
                [only] => *only,
                _ => return Err(PipegraphError::AmbiguousStart { roots: roots.len() }),
            },
        };

        Ok(self.breadth_first(&[start], plugins_only))
    }

    /// Plugin vertices in execution order.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::traverse`].
    pub fn traverse_plugins(&self, start: Option<NodeId>) -> Result<Vec<NodeId>> {
        self.traverse(start, true)
    }

    /// Breadth-first visit seeded with every vertex of `seeds` at once.
    pub(crate) fn breadth_first(&self, seeds: &[NodeId], plugins_only: bool) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = seeds.iter().copied().collect();
        let mut frontier: Vec<NodeId> = Vec::new();
        for id in seeds {
            if !frontier.contains(id) {
                frontier.push(*id);
            }
        }
        let mut visited = Vec::with_capacity(self.graph.node_count());

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &id in &frontier {
                for successor in self.graph.successors(id) {
                    if seen.insert(successor) {
                        next.push(successor);
                    }
                }
            }
            trace!(frontier = frontier.len(), next = next.len(), "bfs step");
            visited.append(&mut frontier);
            frontier = next;
        }

        if plugins_only {
            visited.retain(|id| matches!(self.graph.node(*id), Some(Node::Plugin(_))));
        }
        visited
    }
}
