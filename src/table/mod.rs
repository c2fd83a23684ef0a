//! Table Adapter
//!
//! Binds flattened rows to what a table renders: indentation, loading and
//! error indicators, selection flags, and the per-row commands the
//! presentation layer dispatches back (toggle, edit, delete, add child).

pub mod selection;

use crate::store::{PageStatus, TreeStore};
use crate::tree::ChildState;
use crate::types::NodeId;
use crate::views::{flatten, VisibleRow};
use serde::{Deserialize, Serialize};

pub use selection::{SelectAllState, Selection};

/// Presentation settings for the tree-table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Indentation per depth level
    #[serde(default = "default_indent_unit")]
    pub indent_unit: u32,

    /// Roots per page when no page has been loaded yet
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,

    /// Page sizes offered by the pagination control
    #[serde(default = "default_rows_per_page_options")]
    pub rows_per_page_options: Vec<usize>,
}

fn default_indent_unit() -> u32 {
    16
}

fn default_rows_per_page() -> usize {
    10
}

fn default_rows_per_page_options() -> Vec<usize> {
    vec![5, 10, 25]
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            indent_unit: default_indent_unit(),
            rows_per_page: default_rows_per_page(),
            rows_per_page_options: default_rows_per_page_options(),
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.indent_unit == 0 {
            return Err("indent_unit must be greater than zero".to_string());
        }
        if self.rows_per_page == 0 {
            return Err("rows_per_page must be greater than zero".to_string());
        }
        if self.rows_per_page_options.iter().any(|size| *size == 0) {
            return Err("rows_per_page_options cannot contain zero".to_string());
        }
        if !self.rows_per_page_options.is_empty()
            && !self.rows_per_page_options.contains(&self.rows_per_page)
        {
            return Err(format!(
                "rows_per_page {} is not one of the offered options {:?}",
                self.rows_per_page, self.rows_per_page_options
            ));
        }
        Ok(())
    }
}

/// A row-level action the presentation layer sends back
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowCommand {
    Toggle(NodeId),
    Edit(NodeId),
    Delete(NodeId),
    AddChild(NodeId),
}

impl RowCommand {
    pub fn node_id(&self) -> &NodeId {
        match self {
            RowCommand::Toggle(id)
            | RowCommand::Edit(id)
            | RowCommand::Delete(id)
            | RowCommand::AddChild(id) => id,
        }
    }
}

/// Commands bound to one row; `toggle` is absent when the row is collapsed
/// and has nothing to expand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCommands {
    pub toggle: Option<RowCommand>,
    pub edit: RowCommand,
    pub delete: RowCommand,
    pub add_child: RowCommand,
}

impl RowCommands {
    fn for_row(row: &VisibleRow) -> Self {
        let expandable = row.expanded
            || match row.child_state {
                ChildState::Unloaded | ChildState::Loaded => row.has_children_hint,
                ChildState::Loading | ChildState::Error => true,
                ChildState::Empty => false,
            };
        Self {
            toggle: expandable.then(|| RowCommand::Toggle(row.node_id.clone())),
            edit: RowCommand::Edit(row.node_id.clone()),
            delete: RowCommand::Delete(row.node_id.clone()),
            add_child: RowCommand::AddChild(row.node_id.clone()),
        }
    }
}

/// Render contract for one visible row
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow<P> {
    pub id: NodeId,
    pub depth: usize,
    /// `depth * indent_unit`
    pub indent: u32,
    pub payload: P,
    pub child_state: ChildState,
    pub expanded: bool,
    pub has_children_hint: bool,
    pub loading: bool,
    /// Message of the last failed children fetch, while in `Error`
    pub error: Option<String>,
    pub selected: bool,
    pub commands: RowCommands,
}

/// Everything a tree-table needs for one render pass
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<P> {
    pub rows: Vec<RenderRow<P>>,
    /// Padding rows keeping the table height stable past the first page
    pub empty_rows: usize,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub page_count: usize,
    pub status: PageStatus,
    pub select_all: SelectAllState,
}

/// Padding convention shared with flat paginated tables: no padding on the
/// first page, otherwise fill up to a full page.
pub fn empty_rows(page: usize, page_size: usize, rows_on_page: usize) -> usize {
    if page > 0 {
        page_size.saturating_sub(rows_on_page)
    } else {
        0
    }
}

/// Maps store snapshots to render rows
#[derive(Debug, Clone, Default)]
pub struct TableAdapter {
    config: TableConfig,
}

impl TableAdapter {
    pub fn new(config: TableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn indent(&self, depth: usize) -> u32 {
        u32::try_from(depth)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.config.indent_unit)
    }

    /// Build the render rows for the currently visible part of the tree
    pub fn render<P: Clone>(&self, store: &TreeStore<P>, selection: &Selection) -> TableView<P> {
        let visible = flatten(store);
        let select_all = selection.select_all_state(&visible);

        let rows: Vec<RenderRow<P>> = visible
            .iter()
            .filter_map(|row| {
                let node = store.node(&row.node_id)?;
                Some(RenderRow {
                    id: row.node_id.clone(),
                    depth: row.depth,
                    indent: self.indent(row.depth),
                    payload: node.payload().clone(),
                    child_state: row.child_state,
                    expanded: row.expanded,
                    has_children_hint: row.has_children_hint,
                    loading: row.child_state == ChildState::Loading,
                    error: node.last_error().map(str::to_string),
                    selected: selection.is_selected(&row.node_id),
                    commands: RowCommands::for_row(row),
                })
            })
            .collect();

        let window = store.window();
        let per_page = if window.per_page == 0 {
            self.config.rows_per_page
        } else {
            window.per_page
        };

        TableView {
            empty_rows: empty_rows(window.page, per_page, rows.len()),
            rows,
            page: window.page,
            per_page,
            total: window.total,
            page_count: window.page_count(),
            status: window.status,
            select_all,
        }
    }
}
