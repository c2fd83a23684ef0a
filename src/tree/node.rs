//! Tree node types and the per-node child-loading state machine

use crate::fetcher::NodeRecord;
use crate::types::{NodeId, RequestToken};
use serde::{Deserialize, Serialize};

/// Loading state of a node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildState {
    /// Children never requested
    Unloaded,
    /// A children fetch is in flight
    Loading,
    /// Children fetched, at least one
    Loaded,
    /// Children fetched, none returned
    Empty,
    /// Last children fetch failed; toggling retries
    Error,
}

impl ChildState {
    /// Children are known client-side (`Loaded` or `Empty`)
    pub fn is_settled(self) -> bool {
        matches!(self, ChildState::Loaded | ChildState::Empty)
    }

    /// Legal fetch-driven transitions.
    ///
    /// `Unloaded -> Loading`, `Loading -> Loaded | Empty | Error` and
    /// `Error -> Loading` (retry). Anything else is rejected.
    pub fn can_transition_to(self, next: ChildState) -> bool {
        matches!(
            (self, next),
            (ChildState::Unloaded, ChildState::Loading)
                | (ChildState::Loading, ChildState::Loaded)
                | (ChildState::Loading, ChildState::Empty)
                | (ChildState::Loading, ChildState::Error)
                | (ChildState::Error, ChildState::Loading)
        )
    }
}

/// One hierarchical record held by the store arena.
///
/// Links are ids, never references; `depth` is derived from the parent
/// chain by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<P> {
    pub(crate) id: NodeId,
    pub(crate) parent_id: Option<NodeId>,
    pub(crate) payload: P,
    pub(crate) children_ids: Option<Vec<NodeId>>,
    pub(crate) child_state: ChildState,
    pub(crate) expanded: bool,
    pub(crate) has_children_hint: bool,
    pub(crate) token: RequestToken,
    /// Token captured by the fetch this node is waiting on
    #[serde(default)]
    pub(crate) pending_fetch: Option<RequestToken>,
    #[serde(default)]
    pub(crate) last_error: Option<String>,
    /// Server-confirmed children created while no fetch had settled; merged
    /// into the next successful fetch
    #[serde(default = "Vec::new")]
    pub(crate) pending_inserts: Vec<NodeRecord<P>>,
}

impl<P> Node<P> {
    /// Create an unloaded, collapsed node
    pub(crate) fn new(
        id: NodeId,
        parent_id: Option<NodeId>,
        payload: P,
        has_children_hint: bool,
    ) -> Self {
        Self {
            id,
            parent_id,
            payload,
            children_ids: None,
            child_state: ChildState::Unloaded,
            expanded: false,
            has_children_hint,
            token: 0,
            pending_fetch: None,
            last_error: None,
            pending_inserts: Vec::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Children in display order; `None` until fetched or locally inserted
    pub fn children_ids(&self) -> Option<&[NodeId]> {
        self.children_ids.as_deref()
    }

    pub fn child_state(&self) -> ChildState {
        self.child_state
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn has_children_hint(&self) -> bool {
        self.has_children_hint
    }

    /// Token of the most recent toggle
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Created children waiting for the pending or next fetch to settle
    pub fn pending_inserts(&self) -> &[NodeRecord<P>] {
        &self.pending_inserts
    }

    /// Whether a toggle on this node would start a fetch
    pub fn needs_fetch(&self) -> bool {
        match self.child_state {
            ChildState::Unloaded => self.has_children_hint,
            ChildState::Error => true,
            _ => false,
        }
    }

    /// Apply a fetch-driven state change, returning `false` on an illegal one
    pub(crate) fn transition(&mut self, next: ChildState) -> bool {
        if !self.child_state.can_transition_to(next) {
            return false;
        }
        self.child_state = next;
        if !next.is_settled() {
            self.expanded = false;
        }
        true
    }
}
