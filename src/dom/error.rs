//! Document tree error types

use thiserror::Error;

use super::node::NodeId;

/// Errors raised by tree construction and mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotAText(NodeId),

    #[error("Node {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("Cannot insert {child} into {parent}: {reason}")]
    InvalidHierarchy {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },
}
