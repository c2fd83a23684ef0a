//! Root page window and root-page replacement.

use super::TreeStore;
use crate::fetcher::RootPage;
use crate::tree::{ChildState, Node};
use crate::types::RequestToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Loading status of the root page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageStatus {
    /// No page requested yet
    Idle,
    Loading,
    Loaded,
    /// Last request failed; the previously loaded page, if any, is still shown
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PendingPage {
    token: RequestToken,
    page: usize,
    per_page: usize,
}

/// The offset/limit window of roots currently held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootWindow {
    /// Zero-based page index
    pub page: usize,
    pub per_page: usize,
    /// Total roots across all pages as reported by the server
    pub total: usize,
    pub status: PageStatus,
    #[serde(default)]
    pub(crate) pending: Option<PendingPage>,
}

impl Default for RootWindow {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 0,
            total: 0,
            status: PageStatus::Idle,
            pending: None,
        }
    }
}

impl RootWindow {
    pub fn page_count(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

/// Result of applying a root page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageApplied {
    /// Page installed; `evicted` cached nodes outside the page were dropped
    Applied { roots: usize, evicted: usize },
    /// A newer root request superseded this one
    Stale,
}

impl<P> TreeStore<P> {
    /// Record a root page request and return the token its resolution must
    /// carry. A newer request supersedes any older one still in flight.
    pub fn begin_root_page(&mut self, page: usize, per_page: usize) -> RequestToken {
        let token = self.issue_token();
        self.window.pending = Some(PendingPage {
            token,
            page,
            per_page,
        });
        self.window.status = PageStatus::Loading;
        debug!(page, per_page, token, "Root page requested");
        token
    }

    /// Install a fetched root page.
    ///
    /// Roots missing from the new page are evicted with their subtrees. Roots
    /// present on both pages keep their cached children and expansion; their
    /// payload is refreshed and their hint too while still unloaded.
    pub fn apply_root_page(&mut self, token: RequestToken, root_page: RootPage<P>) -> PageApplied {
        let pending = match self.window.pending {
            Some(pending) if pending.token == token => pending,
            _ => {
                debug!(token, "Discarded stale root page");
                return PageApplied::Stale;
            }
        };

        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(root_page.items.len());
        for record in root_page.items {
            if !seen.insert(record.id.clone()) {
                warn!(node_id = %record.id, "Skipping duplicate root in page");
                continue;
            }
            records.push(record);
        }

        let mut evicted = 0;
        let previous = std::mem::take(&mut self.root_ids);
        for old_root in previous.iter().filter(|id| !seen.contains(*id)) {
            evicted += self.remove_subtree(old_root);
        }
        self.root_ids = previous.into_iter().filter(|id| seen.contains(id)).collect();

        let mut root_ids = Vec::with_capacity(records.len());
        for record in records {
            if let Some(existing) = self.nodes.get_mut(&record.id) {
                if existing.parent_id.is_none() {
                    existing.payload = record.payload;
                    if existing.child_state == ChildState::Unloaded {
                        existing.has_children_hint = record.has_children_hint;
                    }
                    root_ids.push(record.id);
                    continue;
                }
                // Cached lower in a kept subtree; the page now places it at the top
                evicted += self.remove_subtree(&record.id);
            }
            root_ids.push(record.id.clone());
            self.nodes.insert(
                record.id.clone(),
                Node::new(record.id, None, record.payload, record.has_children_hint),
            );
        }

        let roots = root_ids.len();
        self.root_ids = root_ids;
        self.window.page = pending.page;
        self.window.per_page = pending.per_page;
        self.window.total = root_page.total;
        self.window.status = PageStatus::Loaded;
        self.window.pending = None;

        info!(
            page = pending.page,
            per_page = pending.per_page,
            roots,
            evicted,
            total = root_page.total,
            "Root page loaded"
        );
        PageApplied::Applied { roots, evicted }
    }

    /// Record a failed root page request. The current page stays intact.
    ///
    /// Returns `false` when a newer request superseded this one.
    pub fn fail_root_page(&mut self, token: RequestToken) -> bool {
        match self.window.pending {
            Some(pending) if pending.token == token => {
                self.window.pending = None;
                self.window.status = PageStatus::Failed;
                warn!(page = pending.page, token, "Root page failed");
                true
            }
            _ => false,
        }
    }
}
