//! Reducer-style entry point: every store mutation as an action value.

use super::root_page::PageApplied;
use super::transitions::{FetchApplied, InsertOutcome, ToggleOutcome};
use super::TreeStore;
use crate::error::TreeError;
use crate::fetcher::{NodeRecord, RootPage};
use crate::types::{NodeId, RequestToken};

/// One mutation of the tree store
#[derive(Debug, Clone)]
pub enum TreeAction<P> {
    BeginRootPage {
        page: usize,
        per_page: usize,
    },
    RootPageLoaded {
        token: RequestToken,
        page: RootPage<P>,
    },
    RootPageFailed {
        token: RequestToken,
    },
    Toggle(NodeId),
    ChildrenFetched {
        node_id: NodeId,
        token: RequestToken,
        children: Vec<NodeRecord<P>>,
    },
    ChildrenFailed {
        node_id: NodeId,
        token: RequestToken,
        message: String,
    },
    InsertLocalChild {
        parent_id: NodeId,
        record: NodeRecord<P>,
    },
    Remove(NodeId),
    CollapseAll,
}

/// What an action did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    RootPageRequested(RequestToken),
    RootPage(PageApplied),
    /// `false` when the failure belonged to a superseded request
    RootPageFailed(bool),
    Toggled(ToggleOutcome),
    Fetch(FetchApplied),
    Inserted(InsertOutcome),
    Removed(usize),
    CollapsedAll,
}

impl<P> TreeStore<P> {
    /// Apply one action. Errors leave the store untouched.
    pub fn apply(&mut self, action: TreeAction<P>) -> Result<Transition, TreeError> {
        let transition = match action {
            TreeAction::BeginRootPage { page, per_page } => {
                Transition::RootPageRequested(self.begin_root_page(page, per_page))
            }
            TreeAction::RootPageLoaded { token, page } => {
                Transition::RootPage(self.apply_root_page(token, page))
            }
            TreeAction::RootPageFailed { token } => {
                Transition::RootPageFailed(self.fail_root_page(token))
            }
            TreeAction::Toggle(node_id) => Transition::Toggled(self.toggle_expand(&node_id)?),
            TreeAction::ChildrenFetched {
                node_id,
                token,
                children,
            } => Transition::Fetch(self.apply_children_fetched(&node_id, token, children)),
            TreeAction::ChildrenFailed {
                node_id,
                token,
                message,
            } => Transition::Fetch(self.apply_children_failed(&node_id, token, message)),
            TreeAction::InsertLocalChild { parent_id, record } => {
                Transition::Inserted(self.insert_local_child(&parent_id, record)?)
            }
            TreeAction::Remove(node_id) => Transition::Removed(self.remove_node(&node_id)?),
            TreeAction::CollapseAll => {
                self.collapse_all();
                Transition::CollapsedAll
            }
        };
        Ok(transition)
    }

    /// Apply a sequence of actions to a copy of this snapshot, stopping at
    /// the first error.
    pub fn replay<I>(&self, actions: I) -> Result<TreeStore<P>, TreeError>
    where
        P: Clone,
        I: IntoIterator<Item = TreeAction<P>>,
    {
        let mut next = self.clone();
        for action in actions {
            next.apply(action)?;
        }
        Ok(next)
    }
}
