//! Directed edges between plugin and parameter nodes.

use uuid::Uuid;

use super::{GraphElement, NodeId, NodeKind, VertexRef};
use crate::errors::{PipegraphError, Result};

/// A directed edge `tail -> head`.
///
/// Exactly one endpoint is a plugin node and the other a parameter node.
/// `ParameterNode -> PluginNode` is an input binding and
/// `PluginNode -> ParameterNode` an output binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    id: Uuid,
    tail: VertexRef,
    head: VertexRef,
}

impl Link {
    /// Creates a link from `x` to `y`.
    ///
    /// # Errors
    ///
    /// - `InvalidEndpointKind` if either endpoint is not a plugin or parameter node
    /// - `InvalidLinkKind` if both endpoints are of the same kind
    pub fn new<X, Y>(x: &X, y: &Y) -> Result<Self>
    where
        X: GraphElement + ?Sized,
        Y: GraphElement + ?Sized,
    {
        let (tail, head) = match (x.vertex(), y.vertex()) {
            (Some(tail), Some(head)) => (tail, head),
            (None, _) => {
                return Err(PipegraphError::InvalidEndpointKind {
                    found: x.describe(),
                })
            }
            (_, None) => {
                return Err(PipegraphError::InvalidEndpointKind {
                    found: y.describe(),
                })
            }
        };

        if tail.kind == head.kind {
            return Err(PipegraphError::InvalidLinkKind { kind: tail.kind });
        }

        Ok(Self::between(tail, head))
    }

    /// Builds a link whose endpoint kinds are already known to differ.
    pub(crate) fn between(tail: VertexRef, head: VertexRef) -> Self {
        debug_assert_ne!(tail.kind, head.kind);
        Self {
            id: Uuid::new_v4(),
            tail,
            head,
        }
    }

    /// Returns the link id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the source endpoint.
    #[must_use]
    pub const fn tail(&self) -> VertexRef {
        self.tail
    }

    /// Returns the target endpoint.
    #[must_use]
    pub const fn head(&self) -> VertexRef {
        self.head
    }

    /// Returns the id of the plugin endpoint.
    #[must_use]
    pub fn plugin_id(&self) -> NodeId {
        if self.tail.kind == NodeKind::Plugin {
            self.tail.id
        } else {
            self.head.id
        }
    }

    /// Returns the id of the parameter endpoint.
    #[must_use]
    pub fn parameter_id(&self) -> NodeId {
        if self.tail.kind == NodeKind::Parameter {
            self.tail.id
        } else {
            self.head.id
        }
    }

    /// Returns true if data flows from a parameter into a plugin.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.tail.kind == NodeKind::Parameter
    }
}
