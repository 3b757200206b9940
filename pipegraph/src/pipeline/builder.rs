//! Pipeline builder with validation.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::graph::Graph;
use super::{Pipeline, StagingState};
use crate::config::PipelineSettings;
use crate::errors::{PipegraphError, Result};
use crate::nodes::{Element, Link, Node, ParameterNode, PluginNode};
use crate::storage::{LocalStorage, Storage};

/// Default staging root, relative to the working directory.
pub const DEFAULT_STAGING_ROOT: &str = ".workflow";

/// Builder for creating validated pipelines.
///
/// Elements and links are only collected here; everything is validated in
/// [`PipelineBuilder::build`], which either returns a complete pipeline or
/// an error and no pipeline.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    elements: Vec<Element>,
    links: Vec<Link>,
    staging_root: Option<PathBuf>,
    storage: Option<Arc<dyn Storage>>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin node.
    #[must_use]
    pub fn plugin(self, node: PluginNode) -> Self {
        self.element(node)
    }

    /// Adds a parameter node.
    #[must_use]
    pub fn parameter(self, node: ParameterNode) -> Self {
        self.element(node)
    }

    /// Adds any element; non-vertex values are rejected at build time.
    #[must_use]
    pub fn element(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Adds an explicit link.
    #[must_use]
    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Adds explicit links.
    #[must_use]
    pub fn links(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.links.extend(links);
        self
    }

    /// Sets the staging root.
    #[must_use]
    pub fn staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    /// Sets a custom storage backend. Requires an explicit staging root.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Applies process-wide settings.
    #[must_use]
    pub fn settings(self, settings: &PipelineSettings) -> Self {
        self.staging_root(settings.staging_root.clone())
    }

    /// Number of elements added so far.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Builds the pipeline.
    ///
    /// Plugin nodes pull in the parameter nodes they are bound to and the
    /// links of those bindings; vertices and links are deduplicated by id.
    ///
    /// # Errors
    ///
    /// - `Configuration` for a custom storage backend without staging root
    /// - `EmptyPipeline` when no element was added
    /// - `InvalidVertexKind` for an element that is not a node
    /// - `UnknownVertex` for a link to a vertex outside the pipeline
    /// - `DisconnectedPipeline` when the graph is not weakly connected
    /// - `CyclicPipeline` when the graph has a directed cycle
    pub fn build(self) -> Result<Pipeline> {
        let (storage, staging_root) = match (self.storage, self.staging_root) {
            (Some(_), None) => {
                return Err(PipegraphError::Configuration(
                    "a staging root must be specified when specifying a storage backend"
                        .to_string(),
                ))
            }
            (Some(storage), Some(root)) => (storage, root),
            (None, root) => {
                let root = root.unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_ROOT));
                let root = if root.is_absolute() {
                    root
                } else {
                    std::env::current_dir()?.join(root)
                };
                (Arc::new(LocalStorage::new()) as Arc<dyn Storage>, root)
            }
        };

        if self.elements.is_empty() {
            return Err(PipegraphError::EmptyPipeline);
        }

        let mut nodes = Vec::with_capacity(self.elements.len());
        for element in self.elements {
            nodes.push(element.into_node()?);
        }

        let mut induced: Vec<ParameterNode> = Vec::new();
        let mut links = Vec::new();
        for node in &nodes {
            if let Node::Plugin(plugin) = node {
                induced.extend(plugin.bound_ports().map(|(_, p)| p.clone()));
                links.extend(plugin.links().cloned());
            }
        }
        links.extend(self.links);

        let mut graph = Graph::default();
        for node in nodes {
            graph.insert_node(node);
        }
        let mut seen: HashSet<Uuid> = HashSet::new();
        for param in induced {
            if seen.insert(param.id()) {
                graph.insert_node(Node::Parameter(param));
            }
        }
        for link in links {
            graph.insert_link(link)?;
        }

        let components = graph.component_count();
        if components != 1 {
            return Err(PipegraphError::DisconnectedPipeline { components });
        }
        graph.check_acyclic()?;

        let id = Uuid::new_v4();
        let staging_dir = staging_root.join(id.to_string());

        debug!(?storage, "using storage backend");
        info!(
            pipeline_id = %id,
            nodes = graph.node_count(),
            links = graph.link_count(),
            staging_dir = %staging_dir.display(),
            "Built pipeline"
        );

        Ok(Pipeline {
            id,
            graph,
            storage,
            staging_root,
            staging_dir,
            state: StagingState::NotMaterialized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeKind;
    use crate::storage::MemoryStorage;
    use crate::testing::{recording_step, ExecutionLog};
    use serde_json::json;

    #[test]
    fn test_builder_empty_build() {
        let err = PipelineBuilder::new().build().unwrap_err();
        assert!(matches!(err, PipegraphError::EmptyPipeline));
    }

    #[test]
    fn test_builder_rejects_value() {
        let err = PipelineBuilder::new()
            .parameter(ParameterNode::new("/a"))
            .element(json!("not a node"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipegraphError::InvalidVertexKind { .. }));
    }

    #[test]
    fn test_storage_requires_root() {
        let err = PipelineBuilder::new()
            .parameter(ParameterNode::new("/a"))
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipegraphError::Configuration(_)));
    }

    #[test]
    fn test_default_root_under_cwd() {
        let pipeline = PipelineBuilder::new()
            .parameter(ParameterNode::new("/a"))
            .build()
            .unwrap();

        let expected = std::env::current_dir().unwrap().join(DEFAULT_STAGING_ROOT);
        assert_eq!(pipeline.staging_root(), expected.as_path());
        assert_eq!(
            pipeline.staging_dir(),
            expected.join(pipeline.id().to_string()).as_path()
        );
        assert!(!pipeline.is_materialized());
    }

    #[test]
    fn test_single_plugin_pulls_in_out_dir() {
        let node = recording_step("solo", &[], &["outDir"], &ExecutionLog::new());
        let pipeline = PipelineBuilder::new()
            .plugin(node)
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        assert_eq!(pipeline.node_count(), 2);
        assert_eq!(pipeline.link_count(), 1);
        let kinds: Vec<NodeKind> = pipeline.nodes().map(Node::kind).collect();
        assert_eq!(kinds, vec![NodeKind::Plugin, NodeKind::Parameter]);
    }

    #[test]
    fn test_explicit_link_to_outside_vertex() {
        let log = ExecutionLog::new();
        let node = recording_step("a", &[], &["outDir"], &log);
        let stray = ParameterNode::new("/elsewhere");
        let link = Link::new(&node, &stray).unwrap();

        let err = PipelineBuilder::new()
            .plugin(node)
            .link(link)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipegraphError::UnknownVertex(id) if id == stray.id()));
    }

    #[test]
    fn test_settings_root() {
        let settings = PipelineSettings::new().with_staging_root("/scratch");
        let pipeline = PipelineBuilder::new()
            .parameter(ParameterNode::new("/a"))
            .settings(&settings)
            .build()
            .unwrap();
        assert!(pipeline.staging_dir().starts_with("/scratch"));
    }
}
