//! Error types for pipegraph.
//!
//! Every failure mode of graph construction, staging and execution is a
//! variant of [`PipegraphError`]. None of them are retried; they are all
//! surfaced to the caller of the failing operation.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::nodes::NodeKind;

/// The main error type for pipegraph operations.
#[derive(Debug, Error)]
pub enum PipegraphError {
    /// Something other than a plugin or parameter node was offered as a vertex.
    #[error("Vertices must be PluginNodes or ParameterNodes, got {found}")]
    InvalidVertexKind {
        /// Description of the rejected value.
        found: String,
    },

    /// Something other than a plugin or parameter node was offered as a link endpoint.
    #[error("Links can only connect PluginNodes and ParameterNodes, got {found}")]
    InvalidEndpointKind {
        /// Description of the rejected value.
        found: String,
    },

    /// Both link endpoints are of the same node kind.
    #[error("Cannot link two {kind}s")]
    InvalidLinkKind {
        /// The kind shared by both endpoints.
        kind: NodeKind,
    },

    /// An explicit link refers to a vertex that is not part of the pipeline.
    #[error("Link endpoint {0} is not a vertex of the pipeline")]
    UnknownVertex(Uuid),

    /// No vertices were supplied.
    #[error("Pipeline has no nodes")]
    EmptyPipeline,

    /// The underlying undirected graph has more than one component.
    #[error("The pipeline must be connected (found {components} components)")]
    DisconnectedPipeline {
        /// Number of weakly connected components found.
        components: usize,
    },

    /// The directed graph contains at least one cycle.
    #[error("The pipeline cannot contain any cycles ({} nodes left on a cycle)", remaining.len())]
    CyclicPipeline {
        /// Nodes that could not be removed by out-degree reduction.
        remaining: Vec<Uuid>,
    },

    /// Traversal was requested without a start and the root is not unique.
    #[error("Cannot pick a starting node: pipeline has {roots} roots")]
    AmbiguousStart {
        /// Number of roots in the pipeline.
        roots: usize,
    },

    /// An explicit traversal start is not a root of the pipeline.
    #[error("Invalid starting node {0}: not a root of the pipeline")]
    InvalidStart(Uuid),

    /// Programmer misuse detected while configuring a pipeline.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pipeline config names a plugin that has no registered factory.
    #[error("No plugin factory registered for '{0}'")]
    UnknownPlugin(String),

    /// The storage backend failed to create a staging directory.
    #[error("Failed to create staging directory {}: {source}", path.display())]
    StagingIo {
        /// Directory that could not be created.
        path: PathBuf,
        /// Backend error.
        #[source]
        source: std::io::Error,
    },

    /// A config or index file could not be persisted.
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        /// Target file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// A plugin step failed while running.
    #[error("Step '{step}' ({id}) failed: {source}")]
    StepExecution {
        /// Plugin name.
        step: String,
        /// Plugin node id.
        id: Uuid,
        /// Error reported by the plugin.
        #[source]
        source: anyhow::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipegraphError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidVertexKind { .. } => "PIPELINE-VERTEX-KIND",
            Self::InvalidEndpointKind { .. } => "LINK-ENDPOINT-KIND",
            Self::InvalidLinkKind { .. } => "LINK-KIND",
            Self::UnknownVertex(_) => "LINK-UNKNOWN-VERTEX",
            Self::EmptyPipeline => "PIPELINE-EMPTY",
            Self::DisconnectedPipeline { .. } => "PIPELINE-DISCONNECTED",
            Self::CyclicPipeline { .. } => "PIPELINE-CYCLE",
            Self::AmbiguousStart { .. } => "TRAVERSE-AMBIGUOUS-START",
            Self::InvalidStart(_) => "TRAVERSE-INVALID-START",
            Self::Configuration(_) => "CONFIG",
            Self::UnknownPlugin(_) => "CONFIG-UNKNOWN-PLUGIN",
            Self::StagingIo { .. } => "STAGING-IO",
            Self::Persistence { .. } => "STAGING-PERSIST",
            Self::StepExecution { .. } => "STEP-EXECUTION",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Io(_) => "IO",
        }
    }

    /// Hint for fixing structural errors, when one applies.
    #[must_use]
    pub const fn fix_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidLinkKind { .. } => {
                Some("Links always connect a PluginNode with a ParameterNode.")
            }
            Self::DisconnectedPipeline { .. } => Some(
                "Share a ParameterNode between steps, e.g. bind a step input to another \
                 step's output node.",
            ),
            Self::CyclicPipeline { .. } => {
                Some("Remove one of the bindings that feeds a step's output back into its inputs.")
            }
            Self::AmbiguousStart { .. } => Some("Pass an explicit root node as the start."),
            Self::Configuration(_) => {
                Some("A custom storage backend requires an explicit staging root.")
            }
            _ => None,
        }
    }

    /// Returns true for errors raised while validating graph structure.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidVertexKind { .. }
                | Self::InvalidEndpointKind { .. }
                | Self::InvalidLinkKind { .. }
                | Self::UnknownVertex(_)
                | Self::EmptyPipeline
                | Self::DisconnectedPipeline { .. }
                | Self::CyclicPipeline { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipegraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PipegraphError::CyclicPipeline {
            remaining: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert_eq!(err.code(), "PIPELINE-CYCLE");
        assert!(err.to_string().contains("2 nodes"));
        assert!(err.fix_hint().is_some());
        assert!(err.is_structural());
    }

    #[test]
    fn test_link_kind_message() {
        let err = PipegraphError::InvalidLinkKind {
            kind: NodeKind::Plugin,
        };
        assert_eq!(err.to_string(), "Cannot link two PluginNodes");
    }

    #[test]
    fn test_step_error_keeps_source() {
        use std::error::Error as _;

        let err = PipegraphError::StepExecution {
            step: "threshold".to_string(),
            id: Uuid::new_v4(),
            source: anyhow::anyhow!("exit status 3"),
        };
        assert_eq!(err.code(), "STEP-EXECUTION");
        assert!(!err.is_structural());
        assert_eq!(err.source().map(ToString::to_string), Some("exit status 3".to_string()));
    }
}
