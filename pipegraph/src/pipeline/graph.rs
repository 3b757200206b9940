//! Arena of vertices and links with adjacency lists.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;
use uuid::Uuid;

use crate::errors::{PipegraphError, Result};
use crate::nodes::{Link, Node, NodeId, PluginNode};

/// Vertices and links of a pipeline.
///
/// Vertices and links are kept in insertion order so that traversal and
/// staging are deterministic.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    links: HashMap<Uuid, Link>,
    link_order: Vec<Uuid>,
    outgoing: HashMap<NodeId, Vec<Uuid>>,
    incoming: HashMap<NodeId, Vec<Uuid>>,
}

impl Graph {
    /// Adds a vertex. Returns false if a vertex with the same id is present.
    pub(crate) fn insert_node(&mut self, node: Node) -> bool {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.order.push(id);
        self.outgoing.insert(id, Vec::new());
        self.incoming.insert(id, Vec::new());
        self.nodes.insert(id, node);
        true
    }

    /// Adds a link between two existing vertices. Duplicate ids are ignored.
    pub(crate) fn insert_link(&mut self, link: Link) -> Result<()> {
        for end in [link.tail().id, link.head().id] {
            if !self.nodes.contains_key(&end) {
                return Err(PipegraphError::UnknownVertex(end));
            }
        }
        if self.links.contains_key(&link.id()) {
            return Ok(());
        }

        let id = link.id();
        self.outgoing.entry(link.tail().id).or_default().push(id);
        self.incoming.entry(link.head().id).or_default().push(id);
        self.link_order.push(id);
        self.links.insert(id, link);
        Ok(())
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn plugin(&self, id: NodeId) -> Option<&PluginNode> {
        self.nodes.get(&id).and_then(Node::as_plugin)
    }

    pub(crate) fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub(crate) fn plugin_ids(&self) -> Vec<NodeId> {
        self.nodes()
            .filter_map(Node::as_plugin)
            .map(PluginNode::id)
            .collect()
    }

    pub(crate) fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.link_order.iter().filter_map(|id| self.links.get(id))
    }

    pub(crate) fn node_count(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn link_count(&self) -> usize {
        self.link_order.len()
    }

    /// Heads of the outgoing links of `id`, in link insertion order.
    pub(crate) fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|l| self.links.get(l))
            .map(|l| l.head().id)
    }

    /// Tails of the incoming links of `id`, in link insertion order.
    pub(crate) fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|l| self.links.get(l))
            .map(|l| l.tail().id)
    }

    /// Vertices with no incoming link, in insertion order.
    pub(crate) fn roots(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.incoming.get(id).map_or(true, Vec::is_empty))
            .collect()
    }

    /// Number of weakly connected components.
    pub(crate) fn component_count(&self) -> usize {
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(self.order.len());
        let mut components = 0;

        for &start in &self.order {
            if !seen.insert(start) {
                continue;
            }
            components += 1;

            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                for next in self.successors(id).chain(self.predecessors(id)) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        components
    }

    /// Out-degree reduction: repeatedly remove sinks and decrement the
    /// out-degree of their predecessors (each link counted once).
    ///
    /// Fails with the vertices left over when no sink remains.
    pub(crate) fn check_acyclic(&self) -> Result<()> {
        let mut out_degree: HashMap<NodeId, usize> = self
            .order
            .iter()
            .map(|id| (*id, self.outgoing.get(id).map_or(0, Vec::len)))
            .collect();
        let mut visited_links: HashSet<Uuid> = HashSet::with_capacity(self.links.len());
        let mut rounds = 0usize;

        while !out_degree.is_empty() {
            let sinks: Vec<NodeId> = self
                .order
                .iter()
                .copied()
                .filter(|id| out_degree.get(id) == Some(&0))
                .collect();

            if sinks.is_empty() {
                let remaining: Vec<NodeId> = self
                    .order
                    .iter()
                    .copied()
                    .filter(|id| out_degree.contains_key(id))
                    .collect();
                debug!(remaining = remaining.len(), rounds, "cycle detected");
                return Err(PipegraphError::CyclicPipeline { remaining });
            }

            for sink in sinks {
                for link_id in self.incoming.get(&sink).into_iter().flatten() {
                    if !visited_links.insert(*link_id) {
                        continue;
                    }
                    if let Some(tail) = self.links.get(link_id).map(|l| l.tail().id) {
                        if let Some(degree) = out_degree.get_mut(&tail) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
                out_degree.remove(&sink);
            }
            rounds += 1;
        }
        Ok(())
    }
}
