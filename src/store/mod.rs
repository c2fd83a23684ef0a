//! Tree Store
//!
//! Owns the node arena (id -> node), the ordered root ids of the loaded root
//! page, and the per-node expansion/fetch state machine. The store is the only
//! writer of tree state; the flattener and the table adapter read snapshots.

pub mod action;
pub mod root_page;
pub mod transitions;

use crate::tree::Node;
use crate::types::{NodeId, RequestToken};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use action::{Transition, TreeAction};
pub use root_page::{PageApplied, PageStatus, RootWindow};
pub use transitions::{FetchApplied, InsertOutcome, ToggleOutcome};

/// Arena of nodes plus the root order of the current root page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStore<P> {
    pub(crate) nodes: BTreeMap<NodeId, Node<P>>,
    pub(crate) root_ids: Vec<NodeId>,
    pub(crate) window: RootWindow,
    pub(crate) next_token: RequestToken,
}

impl<P> Default for TreeStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TreeStore<P> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            root_ids: Vec::new(),
            window: RootWindow::default(),
            next_token: 0,
        }
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&Node<P>> {
        self.nodes.get(node_id)
    }

    pub fn payload(&self, node_id: &NodeId) -> Option<&P> {
        self.nodes.get(node_id).map(Node::payload)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node<P>> {
        self.nodes.values()
    }

    /// Arena size (roots and every cached descendant)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn window(&self) -> &RootWindow {
        &self.window
    }

    /// Derived depth: 0 for a root, parent depth + 1 otherwise.
    ///
    /// `None` when the node is absent or its ancestor chain is broken.
    pub fn depth(&self, node_id: &NodeId) -> Option<usize> {
        let mut node = self.nodes.get(node_id)?;
        let mut depth = 0;
        while let Some(parent_id) = node.parent_id.as_ref() {
            node = self.nodes.get(parent_id)?;
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Ancestor ids, nearest first
    pub fn ancestors(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.nodes.get(node_id).and_then(|n| n.parent_id.as_ref());
        while let Some(parent_id) = current {
            if ancestors.len() > self.nodes.len() {
                break;
            }
            ancestors.push(parent_id.clone());
            current = self.nodes.get(parent_id).and_then(|n| n.parent_id.as_ref());
        }
        ancestors
    }

    /// Ids of `node_id` and every cached descendant, in pre-order
    pub fn subtree_ids(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node_id.clone()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if let Some(children) = node.children_ids.as_ref() {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(id);
        }
        out
    }

    /// Report every violated structural invariant; empty when the snapshot is
    /// consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for root_id in &self.root_ids {
            match self.nodes.get(root_id) {
                Some(node) if node.parent_id.is_some() => {
                    violations.push(format!("root {} has a parent", root_id))
                }
                None => violations.push(format!("root {} missing from arena", root_id)),
                _ => {}
            }
        }

        for (id, node) in &self.nodes {
            if node.expanded && !node.child_state.is_settled() {
                violations.push(format!(
                    "{} expanded while {:?}",
                    id, node.child_state
                ));
            }
            if self.depth(id).is_none() {
                violations.push(format!("{} has a broken ancestor chain", id));
            }
            match node.parent_id.as_ref() {
                None if !self.root_ids.contains(id) => {
                    violations.push(format!("{} is parentless but not a root", id))
                }
                Some(parent_id) => {
                    let linked = self
                        .nodes
                        .get(parent_id)
                        .and_then(|p| p.children_ids.as_ref())
                        .map(|children| children.contains(id))
                        .unwrap_or(false);
                    if !linked {
                        violations.push(format!("{} not listed under parent {}", id, parent_id));
                    }
                }
                None => {}
            }
            for child_id in node.children_ids.iter().flatten() {
                let points_back = self
                    .nodes
                    .get(child_id)
                    .map(|child| child.parent_id.as_ref() == Some(id))
                    .unwrap_or(false);
                if !points_back {
                    violations.push(format!("child {} of {} is missing or detached", child_id, id));
                }
            }
        }

        violations
    }

    pub(crate) fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        self.next_token
    }

    /// Detach `node_id` from its parent (or the root list) and drop its
    /// subtree from the arena. Returns the number of nodes removed.
    pub(crate) fn remove_subtree(&mut self, node_id: &NodeId) -> usize {
        let Some(node) = self.nodes.get(node_id) else {
            return 0;
        };
        match node.parent_id.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    if let Some(children) = parent.children_ids.as_mut() {
                        children.retain(|child| child != node_id);
                        if children.is_empty() {
                            parent.has_children_hint = false;
                        }
                    }
                }
            }
            None => self.root_ids.retain(|root| root != node_id),
        }

        let ids = self.subtree_ids(node_id);
        for id in &ids {
            self.nodes.remove(id);
        }
        ids.len()
    }
}
