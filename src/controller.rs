//! Tree Controller
//!
//! Async driver binding a `Fetcher` to a `TreeStore`. Each operation runs its
//! synchronous "begin" transition under a short lock, awaits the fetcher with
//! no lock held, then applies the resolution atomically. Fetch failures come
//! back as typed errors after the store has settled.

use crate::error::TreeError;
use crate::fetcher::Fetcher;
use crate::store::{FetchApplied, InsertOutcome, PageApplied, ToggleOutcome, TreeStore};
use crate::table::{RowCommand, Selection, TableAdapter, TableConfig, TableView};
use crate::types::NodeId;
use crate::views::{flatten, VisibleRow};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a controller toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Collapsed,
    /// Expanded from cache, no fetch
    Expanded,
    /// A fetch ran and its result was applied
    Fetched(FetchApplied),
    /// A fetch for this node is already in flight
    AlreadyLoading,
    NoChildren,
}

/// Outcome of a root page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootLoad {
    Loaded { roots: usize, evicted: usize },
    /// A newer page request finished first; this result was dropped
    Superseded,
}

/// Outcome of a dispatched row command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Toggled(Toggled),
    Deleted { removed: usize },
    /// The edit form for this node should open
    EditRequested(NodeId),
    /// The create form for a child of this node should open; submit it
    /// through `create_child`
    AddChildRequested(NodeId),
}

/// Owns the store and selection for one tree-table
pub struct TreeController<F: Fetcher> {
    fetcher: Arc<F>,
    store: Mutex<TreeStore<F::Payload>>,
    selection: Mutex<Selection>,
    adapter: TableAdapter,
}

impl<F: Fetcher> TreeController<F> {
    pub fn new(fetcher: Arc<F>, config: TableConfig) -> Self {
        Self {
            fetcher,
            store: Mutex::new(TreeStore::new()),
            selection: Mutex::new(Selection::new()),
            adapter: TableAdapter::new(config),
        }
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Load a page of roots, replacing the current one.
    ///
    /// On failure the previously loaded page stays in place. A request that a
    /// newer one superseded reports `Superseded` whether it succeeded or not.
    pub async fn load_root_page(&self, page: usize, per_page: usize) -> Result<RootLoad, TreeError> {
        let token = self.store.lock().begin_root_page(page, per_page);

        match self.fetcher.fetch_root_page(page, per_page).await {
            Ok(root_page) => {
                let mut store = self.store.lock();
                let applied = store.apply_root_page(token, root_page);
                let pruned = self.selection.lock().retain_existing(&store);
                if pruned > 0 {
                    debug!(pruned, "Pruned selection after page change");
                }
                Ok(match applied {
                    PageApplied::Applied { roots, evicted } => RootLoad::Loaded { roots, evicted },
                    PageApplied::Stale => RootLoad::Superseded,
                })
            }
            Err(source) => {
                if !self.store.lock().fail_root_page(token) {
                    debug!(page, error = %source, "Dropped failure of superseded root page");
                    return Ok(RootLoad::Superseded);
                }
                Err(TreeError::FetchRootPageFailed { page, source })
            }
        }
    }

    /// Reload the current root page with its current size
    pub async fn reload(&self) -> Result<RootLoad, TreeError> {
        let (page, per_page) = {
            let store = self.store.lock();
            let window = store.window();
            let per_page = if window.per_page == 0 {
                self.adapter.config().rows_per_page
            } else {
                window.per_page
            };
            (window.page, per_page)
        };
        self.load_root_page(page, per_page).await
    }

    /// Toggle a node, fetching its children on first expansion.
    ///
    /// A failed fetch leaves the node in `Error` (collapsed) and is returned
    /// as `FetchChildrenFailed`; toggling again retries.
    pub async fn toggle_expand(&self, node_id: &NodeId) -> Result<Toggled, TreeError> {
        let outcome = self.store.lock().toggle_expand(node_id)?;
        let token = match outcome {
            ToggleOutcome::FetchRequired { token } => token,
            ToggleOutcome::Collapsed => return Ok(Toggled::Collapsed),
            ToggleOutcome::Expanded => return Ok(Toggled::Expanded),
            ToggleOutcome::AlreadyLoading => return Ok(Toggled::AlreadyLoading),
            ToggleOutcome::NoChildren => return Ok(Toggled::NoChildren),
        };

        match self.fetcher.fetch_children(node_id).await {
            Ok(children) => {
                let count = children.len();
                let applied = self
                    .store
                    .lock()
                    .apply_children_fetched(node_id, token, children);
                debug!(node_id = %node_id, count, applied = ?applied, "Children fetch resolved");
                Ok(Toggled::Fetched(applied))
            }
            Err(source) => {
                let applied = self
                    .store
                    .lock()
                    .apply_children_failed(node_id, token, source.to_string());
                if applied == FetchApplied::Discarded {
                    return Ok(Toggled::Fetched(applied));
                }
                Err(TreeError::FetchChildrenFailed {
                    node_id: node_id.clone(),
                    source,
                })
            }
        }
    }

    /// Create a child on the server, then insert it locally.
    ///
    /// Nothing is inserted before the server confirms. While the parent's
    /// children fetch is pending or failed, the record is held on the parent
    /// and merged when a fetch settles. If the parent was evicted meanwhile,
    /// the created record is not shown.
    pub async fn create_child(
        &self,
        parent_id: &NodeId,
        payload: F::Payload,
    ) -> Result<InsertOutcome, TreeError> {
        if !self.store.lock().contains(parent_id) {
            return Err(TreeError::NodeNotFound(parent_id.clone()));
        }

        let record = self
            .fetcher
            .create_child(parent_id, payload)
            .await
            .map_err(|source| TreeError::CreateChildFailed {
                parent_id: parent_id.clone(),
                source,
            })?;

        let child_id = record.id.clone();
        let outcome = self.store.lock().insert_local_child(parent_id, record);
        match outcome {
            Err(TreeError::NodeNotFound(_)) => {
                warn!(parent_id = %parent_id, child_id = %child_id, "Parent evicted before created child arrived");
                Ok(InsertOutcome::Deferred)
            }
            other => {
                info!(parent_id = %parent_id, child_id = %child_id, "Created child");
                other
            }
        }
    }

    /// Delete a node on the server, then remove it and its subtree locally.
    ///
    /// On failure nothing is removed.
    pub async fn delete_node(&self, node_id: &NodeId) -> Result<usize, TreeError> {
        if !self.store.lock().contains(node_id) {
            return Err(TreeError::NodeNotFound(node_id.clone()));
        }

        self.fetcher
            .delete_node(node_id)
            .await
            .map_err(|source| TreeError::DeleteNodeFailed {
                node_id: node_id.clone(),
                source,
            })?;

        let mut store = self.store.lock();
        let removed = match store.remove_node(node_id) {
            Ok(removed) => removed,
            // Already gone locally (evicted by a page change while deleting)
            Err(TreeError::NodeNotFound(_)) => 0,
            Err(e) => return Err(e),
        };
        self.selection.lock().retain_existing(&store);
        info!(node_id = %node_id, removed, "Deleted node");
        Ok(removed)
    }

    /// Run a row command coming from the presentation layer
    pub async fn dispatch(&self, command: RowCommand) -> Result<Dispatched, TreeError> {
        match command {
            RowCommand::Toggle(node_id) => Ok(Dispatched::Toggled(self.toggle_expand(&node_id).await?)),
            RowCommand::Delete(node_id) => {
                let removed = self.delete_node(&node_id).await?;
                Ok(Dispatched::Deleted { removed })
            }
            RowCommand::Edit(node_id) => {
                self.ensure_exists(&node_id)?;
                Ok(Dispatched::EditRequested(node_id))
            }
            RowCommand::AddChild(node_id) => {
                self.ensure_exists(&node_id)?;
                Ok(Dispatched::AddChildRequested(node_id))
            }
        }
    }

    pub fn collapse_all(&self) {
        self.store.lock().collapse_all();
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        flatten(&self.store.lock())
    }

    /// Render the current state for the table
    pub fn table(&self) -> TableView<F::Payload> {
        let store = self.store.lock();
        let selection = self.selection.lock();
        self.adapter.render(&store, &selection)
    }

    /// Read-only access to the current store snapshot
    pub fn read<R>(&self, f: impl FnOnce(&TreeStore<F::Payload>) -> R) -> R {
        f(&self.store.lock())
    }

    /// Copy of the current store snapshot
    pub fn snapshot(&self) -> TreeStore<F::Payload> {
        self.store.lock().clone()
    }

    pub fn toggle_selected(&self, node_id: &NodeId) -> Result<bool, TreeError> {
        self.ensure_exists(node_id)?;
        Ok(self.selection.lock().toggle(node_id))
    }

    /// Select every visible row; descendants of collapsed rows stay untouched
    pub fn select_all_visible(&self) -> usize {
        let rows = self.visible_rows();
        self.selection.lock().select_all_visible(&rows)
    }

    pub fn clear_selection(&self) {
        self.selection.lock().clear();
    }

    pub fn selected(&self) -> Vec<NodeId> {
        self.selection.lock().ids()
    }

    fn ensure_exists(&self, node_id: &NodeId) -> Result<(), TreeError> {
        if self.store.lock().contains(node_id) {
            Ok(())
        } else {
            Err(TreeError::NodeNotFound(node_id.clone()))
        }
    }
}
