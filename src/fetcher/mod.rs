//! Fetcher contract
//!
//! The engine's only view of the REST layer: root-page retrieval, per-node
//! children retrieval, and create/delete calls. All calls are async and
//! fallible; the store has a defined transition for every failure.

pub mod memory;

use crate::types::NodeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryFetcher;

/// One record as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord<P> {
    pub id: NodeId,
    pub payload: P,
    /// Whether the server reports children; decides if an expand affordance
    /// is shown before the first fetch
    #[serde(default)]
    pub has_children_hint: bool,
}

impl<P> NodeRecord<P> {
    pub fn new(id: impl Into<NodeId>, payload: P, has_children_hint: bool) -> Self {
        Self {
            id: id.into(),
            payload,
            has_children_hint,
        }
    }
}

/// One offset/limit page of top-level records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootPage<P> {
    pub items: Vec<NodeRecord<P>>,
    /// Total number of roots across all pages
    pub total: usize,
}

/// Failure reported by a fetcher implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server responded {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Record not found: {0}")]
    NotFound(NodeId),
}

/// Async retrieval and mutation calls the engine depends on.
///
/// Implemented by the surrounding REST layer. Children are fetched in full
/// per node; only roots are paginated.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Opaque domain payload carried by every record
    type Payload: Clone + Send + Sync + 'static;

    /// Fetch one page of roots. `page` is zero-based.
    async fn fetch_root_page(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<RootPage<Self::Payload>, FetchError>;

    /// Fetch every child of a node, in display order
    async fn fetch_children(
        &self,
        node_id: &NodeId,
    ) -> Result<Vec<NodeRecord<Self::Payload>>, FetchError>;

    /// Create a child under `parent_id`, returning the confirmed record
    async fn create_child(
        &self,
        parent_id: &NodeId,
        payload: Self::Payload,
    ) -> Result<NodeRecord<Self::Payload>, FetchError>;

    /// Delete a node together with its subtree
    async fn delete_node(&self, node_id: &NodeId) -> Result<(), FetchError>;
}
