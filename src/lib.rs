//! Treegrid: Lazy-Loading Hierarchical Tree-Table Engine
//!
//! Client-side state for a paginated table whose rows form a tree. Roots are
//! loaded a page at a time, children are fetched on first expansion and
//! cached, and the expanded part of the tree is flattened into depth-annotated
//! rows a table can render.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod store;
pub mod table;
pub mod tree;
pub mod types;
pub mod views;

pub use controller::{Dispatched, RootLoad, Toggled, TreeController};
pub use error::TreeError;
pub use fetcher::{FetchError, Fetcher, InMemoryFetcher, NodeRecord, RootPage};
pub use store::TreeStore;
pub use tree::{ChildState, Node};
pub use types::{NodeId, RequestToken};
pub use views::{flatten, VisibleRow};
