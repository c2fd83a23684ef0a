//! Row selection
//!
//! An independent set of selected node ids. Selecting a node never cascades
//! to its descendants: unfetched descendants may not exist client-side.
//! "Select all" only ever covers the rows currently visible.

use crate::store::TreeStore;
use crate::types::NodeId;
use crate::views::VisibleRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// State of the header "select all" checkbox over the visible rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    None,
    Partial,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    selected: BTreeSet<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not selected before
    pub fn select(&mut self, node_id: NodeId) -> bool {
        self.selected.insert(node_id)
    }

    pub fn deselect(&mut self, node_id: &NodeId) -> bool {
        self.selected.remove(node_id)
    }

    /// Flip one id; returns whether it is now selected
    pub fn toggle(&mut self, node_id: &NodeId) -> bool {
        if self.selected.remove(node_id) {
            false
        } else {
            self.selected.insert(node_id.clone());
            true
        }
    }

    pub fn is_selected(&self, node_id: &NodeId) -> bool {
        self.selected.contains(node_id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in id order
    pub fn ids(&self) -> Vec<NodeId> {
        self.selected.iter().cloned().collect()
    }

    /// Select every visible row. Returns how many were newly selected.
    pub fn select_all_visible(&mut self, rows: &[VisibleRow]) -> usize {
        rows.iter()
            .filter(|row| self.selected.insert(row.node_id.clone()))
            .count()
    }

    /// Header checkbox behaviour: deselect the visible rows when all of them
    /// are selected, select them all otherwise.
    pub fn toggle_all_visible(&mut self, rows: &[VisibleRow]) {
        if self.select_all_state(rows) == SelectAllState::All {
            for row in rows {
                self.selected.remove(&row.node_id);
            }
        } else {
            self.select_all_visible(rows);
        }
    }

    pub fn select_all_state(&self, rows: &[VisibleRow]) -> SelectAllState {
        let selected = rows
            .iter()
            .filter(|row| self.selected.contains(&row.node_id))
            .count();
        match selected {
            0 => SelectAllState::None,
            n if n == rows.len() => SelectAllState::All,
            _ => SelectAllState::Partial,
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop ids that no longer exist in the store. Returns how many were
    /// dropped.
    pub fn retain_existing<P>(&mut self, store: &TreeStore<P>) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| store.contains(id));
        before - self.selected.len()
    }
}
