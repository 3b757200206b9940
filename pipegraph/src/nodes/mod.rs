//! Graph vertices and edges.
//!
//! This module contains the typed building blocks of a pipeline:
//! - [`ParameterNode`]: a data artifact location, possibly unresolved
//! - [`PluginNode`]: one processing step with declared input/output ports
//! - [`Link`]: a directed edge between a plugin node and a parameter node
//! - the binding engine ([`BindValue`], [`PluginNode::bind`]) that turns port
//!   assignments into parameter nodes and links

mod binding;
mod link;
mod parameter;
mod plugin;

pub use binding::{BindOutcome, BindValue, Direction};
pub use link::Link;
pub use parameter::ParameterNode;
pub use plugin::{PluginNode, OUT_DIR_PORT, RESERVED_PORT};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::{PipegraphError, Result};

/// Identifier of a vertex (or link) in a pipeline.
pub type NodeId = Uuid;

/// The two vertex variants of a pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A data artifact.
    Parameter,
    /// A processing step.
    Plugin,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter => f.write_str("ParameterNode"),
            Self::Plugin => f.write_str("PluginNode"),
        }
    }
}

/// Identity and kind of a vertex, as stored in a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexRef {
    /// The vertex id.
    pub id: NodeId,
    /// The vertex kind.
    pub kind: NodeKind,
}

/// Anything that may be offered as a vertex or link endpoint.
///
/// Only plugin and parameter nodes answer with a [`VertexRef`]; every other
/// implementor is rejected by [`Link::new`] and the pipeline builder.
pub trait GraphElement {
    /// Returns the vertex this element stands for, if it is one.
    fn vertex(&self) -> Option<VertexRef>;

    /// Short description used in error messages.
    fn describe(&self) -> String;
}

impl GraphElement for serde_json::Value {
    fn vertex(&self) -> Option<VertexRef> {
        None
    }

    fn describe(&self) -> String {
        format!("literal {self}")
    }
}

impl GraphElement for Path {
    fn vertex(&self) -> Option<VertexRef> {
        None
    }

    fn describe(&self) -> String {
        format!("path {}", self.display())
    }
}

impl GraphElement for PathBuf {
    fn vertex(&self) -> Option<VertexRef> {
        None
    }

    fn describe(&self) -> String {
        self.as_path().describe()
    }
}

impl GraphElement for str {
    fn vertex(&self) -> Option<VertexRef> {
        None
    }

    fn describe(&self) -> String {
        format!("string {self:?}")
    }
}

/// A validated pipeline vertex.
#[derive(Debug)]
pub enum Node {
    /// A data artifact.
    Parameter(ParameterNode),
    /// A processing step.
    Plugin(PluginNode),
}

impl Node {
    /// Returns the vertex id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Self::Parameter(p) => p.id(),
            Self::Plugin(p) => p.id(),
        }
    }

    /// Returns the vertex kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Parameter(_) => NodeKind::Parameter,
            Self::Plugin(_) => NodeKind::Plugin,
        }
    }

    /// Returns true for parameter nodes whose location is not resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Parameter(p) => p.is_empty(),
            Self::Plugin(_) => false,
        }
    }

    /// Returns the plugin node, if this is one.
    #[must_use]
    pub const fn as_plugin(&self) -> Option<&PluginNode> {
        match self {
            Self::Plugin(p) => Some(p),
            Self::Parameter(_) => None,
        }
    }

    /// Returns the plugin node mutably, if this is one.
    pub fn as_plugin_mut(&mut self) -> Option<&mut PluginNode> {
        match self {
            Self::Plugin(p) => Some(p),
            Self::Parameter(_) => None,
        }
    }

    /// Returns the parameter node, if this is one.
    #[must_use]
    pub const fn as_parameter(&self) -> Option<&ParameterNode> {
        match self {
            Self::Parameter(p) => Some(p),
            Self::Plugin(_) => None,
        }
    }
}

impl GraphElement for Node {
    fn vertex(&self) -> Option<VertexRef> {
        Some(VertexRef {
            id: self.id(),
            kind: self.kind(),
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.kind(), self.id())
    }
}

impl From<ParameterNode> for Node {
    fn from(node: ParameterNode) -> Self {
        Self::Parameter(node)
    }
}

impl From<PluginNode> for Node {
    fn from(node: PluginNode) -> Self {
        Self::Plugin(node)
    }
}

/// A candidate vertex handed to the pipeline builder.
///
/// Arbitrary values are representable so that loosely typed callers get a
/// structured `InvalidVertexKind` error instead of a panic.
#[derive(Debug)]
pub enum Element {
    /// A data artifact.
    Parameter(ParameterNode),
    /// A processing step.
    Plugin(PluginNode),
    /// Anything else.
    Value(serde_json::Value),
}

impl Element {
    /// Converts into a validated vertex.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVertexKind` for [`Element::Value`].
    pub fn into_node(self) -> Result<Node> {
        match self {
            Self::Parameter(p) => Ok(Node::Parameter(p)),
            Self::Plugin(p) => Ok(Node::Plugin(p)),
            Self::Value(v) => Err(PipegraphError::InvalidVertexKind {
                found: v.describe(),
            }),
        }
    }
}

impl GraphElement for Element {
    fn vertex(&self) -> Option<VertexRef> {
        match self {
            Self::Parameter(p) => p.vertex(),
            Self::Plugin(p) => p.vertex(),
            Self::Value(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Parameter(p) => p.describe(),
            Self::Plugin(p) => p.describe(),
            Self::Value(v) => v.describe(),
        }
    }
}

impl From<ParameterNode> for Element {
    fn from(node: ParameterNode) -> Self {
        Self::Parameter(node)
    }
}

impl From<PluginNode> for Element {
    fn from(node: PluginNode) -> Self {
        Self::Plugin(node)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        match node {
            Node::Parameter(p) => Self::Parameter(p),
            Node::Plugin(p) => Self::Plugin(p),
        }
    }
}

impl From<serde_json::Value> for Element {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}
