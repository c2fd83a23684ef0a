//! In-memory fetcher
//!
//! Serves a hierarchy held in process memory through the `Fetcher` contract.
//! Records call counts and supports failure injection plus a gate that holds
//! children fetches until released, so interleavings can be driven
//! deterministically. A held children fetch returns the children as they were
//! when it was called.

use super::{FetchError, Fetcher, NodeRecord, RootPage};
use crate::types::NodeId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryEntry<P> {
    parent: Option<NodeId>,
    payload: P,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct MemoryTree<P> {
    entries: HashMap<NodeId, MemoryEntry<P>>,
    roots: Vec<NodeId>,
    next_id: u64,
}

impl<P: Clone> MemoryTree<P> {
    fn record(&self, id: &NodeId) -> Option<NodeRecord<P>> {
        self.entries.get(id).map(|entry| NodeRecord {
            id: id.clone(),
            payload: entry.payload.clone(),
            has_children_hint: !entry.children.is_empty(),
        })
    }

    fn remove_subtree(&mut self, id: &NodeId) {
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.entries.remove(&current) {
                pending.extend(entry.children);
            }
        }
    }
}

/// Failure injection switches
#[derive(Debug, Default)]
struct Failures {
    root_pages: bool,
    /// Remaining failures per node
    children: HashMap<NodeId, usize>,
    create: bool,
    delete: bool,
}

/// Number of calls received per operation
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    pub root_pages: usize,
    pub children: HashMap<NodeId, usize>,
    pub creates: usize,
    pub deletes: usize,
}

/// Fetcher backed by an in-process hierarchy
pub struct InMemoryFetcher<P> {
    tree: Mutex<MemoryTree<P>>,
    failures: Mutex<Failures>,
    calls: Mutex<CallCounts>,
    children_gate: Mutex<Option<Arc<Semaphore>>>,
    root_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl<P: Clone + Send + Sync + 'static> InMemoryFetcher<P> {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(MemoryTree {
                entries: HashMap::new(),
                roots: Vec::new(),
                next_id: 1,
            }),
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(CallCounts::default()),
            children_gate: Mutex::new(None),
            root_gate: Mutex::new(None),
        }
    }

    /// Append a root record
    pub fn add_root(&self, id: impl Into<NodeId>, payload: P) {
        let id = id.into();
        let mut tree = self.tree.lock();
        tree.entries.insert(
            id.clone(),
            MemoryEntry {
                parent: None,
                payload,
                children: Vec::new(),
            },
        );
        tree.roots.push(id);
    }

    /// Append a child record under an existing parent
    pub fn add_child(
        &self,
        parent_id: impl Into<NodeId>,
        id: impl Into<NodeId>,
        payload: P,
    ) -> Result<(), FetchError> {
        let parent_id = parent_id.into();
        let id = id.into();
        let mut tree = self.tree.lock();
        let parent = tree
            .entries
            .get_mut(&parent_id)
            .ok_or_else(|| FetchError::NotFound(parent_id.clone()))?;
        parent.children.push(id.clone());
        tree.entries.insert(
            id,
            MemoryEntry {
                parent: Some(parent_id),
                payload,
                children: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.tree.lock().entries.contains_key(id)
    }

    /// Number of records held, at any depth
    pub fn len(&self) -> usize {
        self.tree.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every root-page fetch fail until switched off
    pub fn fail_root_pages(&self, fail: bool) {
        self.failures.lock().root_pages = fail;
    }

    /// Make the next `times` children fetches for `id` fail
    pub fn fail_children(&self, id: impl Into<NodeId>, times: usize) {
        self.failures.lock().children.insert(id.into(), times);
    }

    pub fn fail_create(&self, fail: bool) {
        self.failures.lock().create = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.failures.lock().delete = fail;
    }

    /// Hold every subsequent children fetch until `release_children` is called
    pub fn pause_children(&self) {
        *self.children_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held children fetches proceed
    pub fn release_children(&self, count: usize) {
        if let Some(gate) = self.children_gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Hold every subsequent root page fetch until `release_root_pages`
    pub fn pause_root_pages(&self) {
        *self.root_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_root_pages(&self, count: usize) {
        if let Some(gate) = self.root_gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.lock().clone()
    }

    pub fn children_calls(&self, id: &NodeId) -> usize {
        self.calls.lock().children.get(id).copied().unwrap_or(0)
    }

    pub fn total_children_calls(&self) -> usize {
        self.calls.lock().children.values().sum()
    }

    fn take_children_failure(&self, id: &NodeId) -> bool {
        let mut failures = self.failures.lock();
        match failures.children.get_mut(id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl<P: Clone + Send + Sync + 'static> Default for InMemoryFetcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static> Fetcher for InMemoryFetcher<P> {
    type Payload = P;

    async fn fetch_root_page(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<RootPage<P>, FetchError> {
        self.calls.lock().root_pages += 1;
        let gate = self.root_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| FetchError::Transport("root page gate closed".to_string()))?
                .forget();
        }
        tokio::task::yield_now().await;

        if self.failures.lock().root_pages {
            return Err(FetchError::Status {
                code: 503,
                message: "root page unavailable".to_string(),
            });
        }

        let tree = self.tree.lock();
        let start = page.saturating_mul(per_page);
        let items = tree
            .roots
            .iter()
            .skip(start)
            .take(per_page)
            .filter_map(|id| tree.record(id))
            .collect();
        debug!(page, per_page, total = tree.roots.len(), "Served root page");
        Ok(RootPage {
            items,
            total: tree.roots.len(),
        })
    }

    async fn fetch_children(&self, node_id: &NodeId) -> Result<Vec<NodeRecord<P>>, FetchError> {
        *self
            .calls
            .lock()
            .children
            .entry(node_id.clone())
            .or_insert(0) += 1;

        // Answer from the state at call time; a held fetch can predate later writes
        let snapshot = {
            let tree = self.tree.lock();
            tree.entries.get(node_id).map(|entry| {
                entry
                    .children
                    .iter()
                    .filter_map(|id| tree.record(id))
                    .collect::<Vec<_>>()
            })
        };

        let gate = self.children_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| FetchError::Transport("children gate closed".to_string()))?
                .forget();
        }
        tokio::task::yield_now().await;

        if self.take_children_failure(node_id) {
            return Err(FetchError::Transport(format!(
                "connection reset while fetching children of {}",
                node_id
            )));
        }

        snapshot.ok_or_else(|| FetchError::NotFound(node_id.clone()))
    }

    async fn create_child(
        &self,
        parent_id: &NodeId,
        payload: P,
    ) -> Result<NodeRecord<P>, FetchError> {
        self.calls.lock().creates += 1;
        tokio::task::yield_now().await;

        if self.failures.lock().create {
            return Err(FetchError::Status {
                code: 422,
                message: "create rejected".to_string(),
            });
        }

        let mut tree = self.tree.lock();
        if !tree.entries.contains_key(parent_id) {
            return Err(FetchError::NotFound(parent_id.clone()));
        }
        let id = loop {
            let candidate = NodeId::new(format!("{}-{}", parent_id, tree.next_id));
            tree.next_id += 1;
            if !tree.entries.contains_key(&candidate) {
                break candidate;
            }
        };
        if let Some(parent) = tree.entries.get_mut(parent_id) {
            parent.children.push(id.clone());
        }
        tree.entries.insert(
            id.clone(),
            MemoryEntry {
                parent: Some(parent_id.clone()),
                payload: payload.clone(),
                children: Vec::new(),
            },
        );
        Ok(NodeRecord {
            id,
            payload,
            has_children_hint: false,
        })
    }

    async fn delete_node(&self, node_id: &NodeId) -> Result<(), FetchError> {
        self.calls.lock().deletes += 1;
        tokio::task::yield_now().await;

        if self.failures.lock().delete {
            return Err(FetchError::Status {
                code: 409,
                message: "delete rejected".to_string(),
            });
        }

        let mut tree = self.tree.lock();
        let parent = tree
            .entries
            .get(node_id)
            .ok_or_else(|| FetchError::NotFound(node_id.clone()))?
            .parent
            .clone();
        match parent {
            Some(parent_id) => {
                if let Some(parent) = tree.entries.get_mut(&parent_id) {
                    parent.children.retain(|child| child != node_id);
                }
            }
            None => tree.roots.retain(|root| root != node_id),
        }
        tree.remove_subtree(node_id);
        Ok(())
    }
}
