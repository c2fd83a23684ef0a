//! Hierarchical node model

pub mod node;

pub use node::{ChildState, Node};
