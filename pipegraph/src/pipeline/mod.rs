//! Pipeline building, staging and execution.
//!
//! This module provides:
//! - [`PipelineBuilder`] with structural validation
//! - traversal in breadth-first dependency order
//! - staging directory materialization and the `index.json` document
//! - the sequential run loop
//! - pipeline config save/load

mod builder;
mod execute;
mod graph;
mod persist;
mod staging;
mod traverse;


pub use builder::{PipelineBuilder, DEFAULT_STAGING_ROOT};
pub use persist::PipelineConfig;
pub use staging::{IndexedParameter, IndexedStep, StagingIndex, INDEX_FILE, NODE_CONFIG_FILE};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::Result;
use crate::nodes::{Element, Link, Node, NodeId, ParameterNode, PluginNode};
use crate::storage::Storage;
use graph::Graph;

/// Whether the staging directories of a pipeline exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagingState {
    /// Nothing has been written to storage.
    #[default]
    NotMaterialized,
    /// Directories, node configs and the index have been written.
    Materialized,
}

/// A validated, connected, acyclic graph of plugin and parameter nodes.
pub struct Pipeline {
    id: Uuid,
    graph: Graph,
    storage: Arc<dyn Storage>,
    staging_root: PathBuf,
    staging_dir: PathBuf,
    state: StagingState,
}

impl Pipeline {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Builds a pipeline with local storage under `./.workflow`.
    ///
    /// # Errors
    ///
    /// Any structural validation error, see [`PipelineBuilder::build`].
    pub fn new<I, E>(elements: I, links: impl IntoIterator<Item = Link>) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        elements
            .into_iter()
            .fold(PipelineBuilder::new(), |builder, e| builder.element(e))
            .links(links)
            .build()
    }

    /// Returns the pipeline id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the staging root shared by all pipelines of a backend.
    #[must_use]
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Returns `staging_root/<pipeline id>`.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns the staging state.
    #[must_use]
    pub const fn state(&self) -> StagingState {
        self.state
    }

    /// Returns true once [`Pipeline::materialize`] succeeded.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.state == StagingState::Materialized
    }

    /// Looks up a vertex.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    /// Looks up a plugin vertex.
    #[must_use]
    pub fn plugin(&self, id: NodeId) -> Option<&PluginNode> {
        self.graph.plugin(id)
    }

    /// Looks up a parameter vertex.
    #[must_use]
    pub fn parameter(&self, id: NodeId) -> Option<&ParameterNode> {
        self.graph.node(id).and_then(Node::as_parameter)
    }

    /// All vertices, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.nodes()
    }

    /// All plugin vertices, in insertion order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginNode> + '_ {
        self.graph.nodes().filter_map(Node::as_plugin)
    }

    /// All links, in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.graph.links()
    }

    /// Number of vertices.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.graph.link_count()
    }

    /// Number of plugin vertices.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.plugins().count()
    }

    /// Number of parameter vertices.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.graph.node_count() - self.plugin_count()
    }

    /// Direct successors of a vertex, in link insertion order.
    #[must_use]
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph.successors(id).collect()
    }

    /// Direct predecessors of a vertex, in link insertion order.
    #[must_use]
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph.predecessors(id).collect()
    }

    /// Vertices without incoming links.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        self.graph.roots()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("nodes", &self.graph.node_count())
            .field("links", &self.graph.link_count())
            .field("staging_dir", &self.staging_dir)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
