//! Node-level transitions: toggle, fetch resolution, local insert, removal.

use super::TreeStore;
use crate::error::TreeError;
use crate::fetcher::NodeRecord;
use crate::tree::{ChildState, Node};
use crate::types::{NodeId, RequestToken};
use tracing::{debug, warn};

/// Result of a toggle on the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Was expanded; now collapsed, cache kept
    Collapsed,
    /// Children already known; expanded without a fetch
    Expanded,
    /// Node moved to `Loading`; the caller must fetch children with `token`
    FetchRequired { token: RequestToken },
    /// A fetch is already in flight; nothing issued
    AlreadyLoading,
    /// Server reports no children; nothing to do
    NoChildren,
}

/// Result of applying a children fetch resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchApplied {
    /// Children cached and node expanded
    Expanded,
    /// Children cached; a newer toggle superseded the expansion
    Cached,
    /// Node settled in `Error`
    Failed,
    /// Node gone or no longer waiting on this fetch; result dropped
    Discarded,
}

/// Result of a local insert after a confirmed create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Appended to already-known children
    Appended,
    /// Parent was unloaded; now loaded and expanded with this single child
    LoadedWithChild,
    /// Parent fetch pending or failed; the record is held on the parent and
    /// appended when the next fetch settles, unless that fetch returns it
    Deferred,
}

impl<P> TreeStore<P> {
    /// Toggle the expansion of a node.
    ///
    /// Collapse never evicts; expanding known children never fetches; at most
    /// one fetch per node is ever requested. Every toggle stamps the node with
    /// a fresh token so an older fetch cannot force expansion.
    pub fn toggle_expand(&mut self, node_id: &NodeId) -> Result<ToggleOutcome, TreeError> {
        if !self.nodes.contains_key(node_id) {
            return Err(TreeError::NodeNotFound(node_id.clone()));
        }
        let token = self.issue_token();
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;
        node.token = token;

        let outcome = if node.expanded {
            node.expanded = false;
            ToggleOutcome::Collapsed
        } else {
            match node.child_state {
                ChildState::Loading => ToggleOutcome::AlreadyLoading,
                ChildState::Loaded | ChildState::Empty => {
                    node.expanded = true;
                    ToggleOutcome::Expanded
                }
                ChildState::Unloaded if !node.has_children_hint => ToggleOutcome::NoChildren,
                ChildState::Unloaded | ChildState::Error => {
                    node.transition(ChildState::Loading);
                    node.pending_fetch = Some(token);
                    node.last_error = None;
                    ToggleOutcome::FetchRequired { token }
                }
            }
        };

        debug!(node_id = %node_id, token, outcome = ?outcome, "Toggled node");
        Ok(outcome)
    }

    /// Apply a successful children fetch started with `token`.
    pub fn apply_children_fetched(
        &mut self,
        node_id: &NodeId,
        token: RequestToken,
        children: Vec<NodeRecord<P>>,
    ) -> FetchApplied {
        let Some(expand) = self.awaiting(node_id, token) else {
            debug!(node_id = %node_id, token, "Discarded stale children fetch");
            return FetchApplied::Discarded;
        };

        let pending = self
            .nodes
            .get_mut(node_id)
            .map(|node| std::mem::take(&mut node.pending_inserts))
            .unwrap_or_default();
        let mut child_ids = Vec::with_capacity(children.len() + pending.len());
        let mut merged = 0;
        for record in children {
            if self.nodes.contains_key(&record.id) {
                warn!(
                    node_id = %node_id,
                    child_id = %record.id,
                    "Skipping child already present in tree"
                );
                continue;
            }
            child_ids.push(record.id.clone());
            self.nodes.insert(
                record.id.clone(),
                Node::new(
                    record.id,
                    Some(node_id.clone()),
                    record.payload,
                    record.has_children_hint,
                ),
            );
        }
        // Created records the response predates go after the fetched children
        for record in pending {
            if self.nodes.contains_key(&record.id) {
                continue;
            }
            merged += 1;
            child_ids.push(record.id.clone());
            self.nodes.insert(
                record.id.clone(),
                Node::new(
                    record.id,
                    Some(node_id.clone()),
                    record.payload,
                    record.has_children_hint,
                ),
            );
        }

        let Some(node) = self.nodes.get_mut(node_id) else {
            return FetchApplied::Discarded;
        };
        let next = if child_ids.is_empty() {
            ChildState::Empty
        } else {
            ChildState::Loaded
        };
        node.transition(next);
        node.has_children_hint = !child_ids.is_empty();
        node.children_ids = Some(child_ids);
        node.pending_fetch = None;
        node.expanded = expand;

        debug!(
            node_id = %node_id,
            token,
            state = ?next,
            expanded = expand,
            merged,
            "Applied children fetch"
        );
        if expand {
            FetchApplied::Expanded
        } else {
            FetchApplied::Cached
        }
    }

    /// Apply a failed children fetch started with `token`.
    pub fn apply_children_failed(
        &mut self,
        node_id: &NodeId,
        token: RequestToken,
        message: impl Into<String>,
    ) -> FetchApplied {
        if self.awaiting(node_id, token).is_none() {
            debug!(node_id = %node_id, token, "Discarded stale children failure");
            return FetchApplied::Discarded;
        }
        let Some(node) = self.nodes.get_mut(node_id) else {
            return FetchApplied::Discarded;
        };
        node.transition(ChildState::Error);
        node.pending_fetch = None;
        node.last_error = Some(message.into());
        warn!(node_id = %node_id, token, error = ?node.last_error, "Children fetch failed");
        FetchApplied::Failed
    }

    /// Insert a server-confirmed child under `parent_id` without a round trip.
    pub fn insert_local_child(
        &mut self,
        parent_id: &NodeId,
        record: NodeRecord<P>,
    ) -> Result<InsertOutcome, TreeError> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.clone()))?;
        if self.nodes.contains_key(&record.id)
            || parent.pending_inserts.iter().any(|p| p.id == record.id)
        {
            return Err(TreeError::DuplicateNode(record.id));
        }

        let state = parent.child_state;
        if matches!(state, ChildState::Loading | ChildState::Error) {
            debug!(parent_id = %parent_id, child_id = %record.id, state = ?state, "Deferred local insert");
            if let Some(parent) = self.nodes.get_mut(parent_id) {
                parent.has_children_hint = true;
                parent.pending_inserts.push(record);
            }
            return Ok(InsertOutcome::Deferred);
        }

        let child_id = record.id.clone();
        self.nodes.insert(
            child_id.clone(),
            Node::new(
                record.id,
                Some(parent_id.clone()),
                record.payload,
                record.has_children_hint,
            ),
        );

        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.clone()))?;
        parent.has_children_hint = true;
        let outcome = if state == ChildState::Unloaded {
            // Forced Unloaded -> Loaded: the only transition outside the fetch path
            parent.children_ids = Some(vec![child_id.clone()]);
            parent.child_state = ChildState::Loaded;
            parent.expanded = true;
            InsertOutcome::LoadedWithChild
        } else {
            parent
                .children_ids
                .get_or_insert_with(Vec::new)
                .push(child_id.clone());
            parent.child_state = ChildState::Loaded;
            InsertOutcome::Appended
        };

        debug!(parent_id = %parent_id, child_id = %child_id, outcome = ?outcome, "Inserted local child");
        Ok(outcome)
    }

    /// Remove a node and its whole cached subtree. Returns the number of
    /// nodes removed (descendants + 1).
    ///
    /// A parent left without children stays `Loaded` and loses its expand
    /// affordance; it is never refetched.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<usize, TreeError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| TreeError::NodeNotFound(node_id.clone()))?;
        let was_root = node.is_root();

        let removed = self.remove_subtree(node_id);
        if was_root {
            self.window.total = self.window.total.saturating_sub(1);
        }
        debug!(node_id = %node_id, removed, was_root, "Removed node");
        Ok(removed)
    }

    /// Collapse every node, keeping all caches. Pending fetches still land in
    /// the cache but no longer expand.
    pub fn collapse_all(&mut self) {
        let token = self.issue_token();
        for node in self.nodes.values_mut() {
            node.expanded = false;
            node.token = token;
        }
        debug!(token, nodes = self.nodes.len(), "Collapsed all nodes");
    }

    /// `Some(expand)` when the node is still waiting on the fetch started with
    /// `token`; `expand` tells whether that fetch is still the latest intent.
    fn awaiting(&self, node_id: &NodeId, token: RequestToken) -> Option<bool> {
        let node = self.nodes.get(node_id)?;
        if node.child_state != ChildState::Loading || node.pending_fetch != Some(token) {
            return None;
        }
        Some(node.token == token)
    }
}
