//! Parameter nodes: data artifact references.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::debug;
use uuid::Uuid;

use super::{GraphElement, NodeId, NodeKind, VertexRef};

#[derive(Debug)]
struct ParameterInner {
    id: NodeId,
    location: OnceLock<PathBuf>,
}

/// A data artifact location.
///
/// Cloning is cheap and yields a handle to the *same* node: plugin nodes that
/// share a parameter node (a producer's output bound to a consumer's input)
/// share its identity and its eventual location. An empty node is a
/// placeholder whose location is filled exactly once during staging.
#[derive(Clone)]
pub struct ParameterNode {
    inner: Arc<ParameterInner>,
}

impl ParameterNode {
    /// Creates a resolved parameter node wrapping a known path.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        let node = Self {
            inner: Arc::new(ParameterInner {
                id: Uuid::new_v4(),
                location: OnceLock::from(location.into()),
            }),
        };
        debug!(node_id = %node.id(), location = ?node.location(), "created ParameterNode");
        node
    }

    /// Creates an unresolved placeholder node.
    #[must_use]
    pub fn empty() -> Self {
        let node = Self {
            inner: Arc::new(ParameterInner {
                id: Uuid::new_v4(),
                location: OnceLock::new(),
            }),
        };
        debug!(node_id = %node.id(), "created empty ParameterNode");
        node
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Returns the resolved location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.inner.location.get().map(PathBuf::as_path)
    }

    /// Returns true while the location is unresolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.location.get().is_none()
    }

    /// Fills in the location of a placeholder.
    ///
    /// Returns `true` if this call resolved the node, `false` if it already
    /// had a location (which is left untouched).
    pub(crate) fn resolve(&self, location: PathBuf) -> bool {
        self.inner.location.set(location).is_ok()
    }

    /// Returns true if both handles refer to the same node.
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ParameterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterNode")
            .field("id", &self.inner.id)
            .field("location", &self.location())
            .finish()
    }
}

impl PartialEq for ParameterNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ParameterNode {}

impl Hash for ParameterNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl GraphElement for ParameterNode {
    fn vertex(&self) -> Option<VertexRef> {
        Some(VertexRef {
            id: self.id(),
            kind: NodeKind::Parameter,
        })
    }

    fn describe(&self) -> String {
        format!("ParameterNode {}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_node() {
        let node = ParameterNode::new("/data/images");
        assert!(!node.is_empty());
        assert_eq!(node.location(), Some(Path::new("/data/images")));
    }

    #[test]
    fn test_placeholder_resolves_once() {
        let node = ParameterNode::empty();
        assert!(node.is_empty());

        assert!(node.resolve(PathBuf::from("/staging/a")));
        assert!(!node.resolve(PathBuf::from("/staging/b")));
        assert_eq!(node.location(), Some(Path::new("/staging/a")));
    }

    #[test]
    fn test_clones_share_identity() {
        let node = ParameterNode::empty();
        let alias = node.clone();
        assert!(node.same_node(&alias));
        assert_eq!(node, alias);

        alias.resolve(PathBuf::from("/staging/x"));
        assert_eq!(node.location(), Some(Path::new("/staging/x")));
    }

    #[test]
    fn test_distinct_nodes_for_same_path() {
        let a = ParameterNode::new("/data");
        let b = ParameterNode::new("/data");
        assert_ne!(a, b);
        assert!(!a.same_node(&b));
    }
}
