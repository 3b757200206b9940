//! Values that can be assigned to a plugin port.

use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use super::ParameterNode;

/// Which side of a plugin a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data flows from the bound parameter into the plugin.
    Input,
    /// Data flows from the plugin into the bound parameter.
    Output,
}

/// A value assigned to a plugin port with [`PluginNode::bind`].
///
/// [`PluginNode::bind`]: super::PluginNode::bind
#[derive(Debug, Clone)]
pub enum BindValue {
    /// An existing parameter node, shared as-is.
    Parameter(ParameterNode),
    /// A filesystem path; a fresh parameter node is created for it.
    Path(PathBuf),
    /// Any non-path value, stored on the plugin.
    Literal(Value),
}

impl From<ParameterNode> for BindValue {
    fn from(node: ParameterNode) -> Self {
        Self::Parameter(node)
    }
}

impl From<&ParameterNode> for BindValue {
    fn from(node: &ParameterNode) -> Self {
        Self::Parameter(node.clone())
    }
}

impl From<PathBuf> for BindValue {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for BindValue {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::String(value))
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        Self::Literal(Value::from(value))
    }
}

/// What a call to [`PluginNode::bind`] did.
///
/// [`PluginNode::bind`]: super::PluginNode::bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The port is now connected to a parameter node through a link.
    Linked {
        /// The bound parameter node.
        node: Uuid,
        /// The link created for the binding.
        link: Uuid,
        /// Side of the plugin the port is on.
        direction: Direction,
    },
    /// A literal was stored on a declared port.
    Literal,
    /// The name is not a declared port; the value went straight to the plugin.
    PassThrough,
}
