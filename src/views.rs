//! Visible Rows
//!
//! Derives the ordered, depth-annotated list of rows a tree-table shows from
//! a store snapshot. Pure and deterministic: identical snapshots yield
//! identical rows.

use crate::store::TreeStore;
use crate::tree::ChildState;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// One row of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRow {
    pub node_id: NodeId,
    pub depth: usize,
    pub child_state: ChildState,
    pub expanded: bool,
    pub has_children_hint: bool,
}

/// Flatten the expanded part of the tree into rows.
///
/// Iterative pre-order traversal seeded with the roots in order. Children are
/// pushed ahead of the remaining stack only for nodes that are expanded and
/// `Loaded`, so they render directly under their parent.
pub fn flatten<P>(store: &TreeStore<P>) -> Vec<VisibleRow> {
    let mut rows = Vec::with_capacity(store.root_ids().len());
    let mut stack: Vec<(&NodeId, usize)> = store.root_ids().iter().rev().map(|id| (id, 0)).collect();

    while let Some((node_id, depth)) = stack.pop() {
        let Some(node) = store.node(node_id) else {
            continue;
        };
        rows.push(VisibleRow {
            node_id: node_id.clone(),
            depth,
            child_state: node.child_state(),
            expanded: node.is_expanded(),
            has_children_hint: node.has_children_hint(),
        });

        if node.is_expanded() && node.child_state() == ChildState::Loaded {
            if let Some(children) = node.children_ids() {
                stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
            }
        }
    }

    rows
}

/// Row ids in display order
pub fn visible_ids(rows: &[VisibleRow]) -> Vec<NodeId> {
    rows.iter().map(|row| row.node_id.clone()).collect()
}
