//! Error types for the tree-table engine.

use crate::fetcher::FetchError;
use crate::types::NodeId;
use thiserror::Error;

/// Errors surfaced by tree operations.
///
/// Fetch failures are scoped to the operation that triggered them; none of
/// them leaves the store in a partially applied state.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Failed to fetch root page {page}: {source}")]
    FetchRootPageFailed {
        page: usize,
        #[source]
        source: FetchError,
    },

    #[error("Failed to fetch children of {node_id}: {source}")]
    FetchChildrenFailed {
        node_id: NodeId,
        #[source]
        source: FetchError,
    },

    #[error("Failed to create child under {parent_id}: {source}")]
    CreateChildFailed {
        parent_id: NodeId,
        #[source]
        source: FetchError,
    },

    #[error("Failed to delete {node_id}: {source}")]
    DeleteNodeFailed {
        node_id: NodeId,
        #[source]
        source: FetchError,
    },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node already present in tree: {0}")]
    DuplicateNode(NodeId),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TreeError {
    /// Node the error is scoped to, when there is one
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            TreeError::FetchChildrenFailed { node_id, .. }
            | TreeError::DeleteNodeFailed { node_id, .. }
            | TreeError::NodeNotFound(node_id)
            | TreeError::DuplicateNode(node_id) => Some(node_id),
            TreeError::CreateChildFailed { parent_id, .. } => Some(parent_id),
            TreeError::FetchRootPageFailed { .. } | TreeError::ConfigError(_) => None,
        }
    }
}
