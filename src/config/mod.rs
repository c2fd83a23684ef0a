//! Configuration
//!
//! Layered configuration for the tree-table: built-in defaults, then an
//! optional TOML file, then `TREEGRID__*` environment overrides.

pub mod facade;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::table::TableConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeGridConfig {
    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TreeGridConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.table.validate()
    }
}
