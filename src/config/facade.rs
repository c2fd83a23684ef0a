//! ConfigLoader facade composing the configuration sources.

use super::sources::{environment, file};
use super::TreeGridConfig;
use crate::error::TreeError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults overlaid with environment variables.
    pub fn load() -> Result<TreeGridConfig, TreeError> {
        Self::finish(Config::builder(), environment::source())
    }

    /// Load `treegrid.toml` from `dir` if present, then environment.
    pub fn load_from_dir(dir: &Path) -> Result<TreeGridConfig, TreeError> {
        let builder = file::add_to_builder(
            Config::builder(),
            &dir.join(file::CONFIG_FILE_NAME),
            false,
        );
        Self::finish(builder, environment::source())
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<TreeGridConfig, TreeError> {
        let builder = file::add_to_builder(Config::builder(), path, true);
        Self::finish(builder, environment::source())
    }

    /// Create default configuration.
    pub fn default() -> TreeGridConfig {
        TreeGridConfig::default()
    }

    pub(crate) fn finish(
        builder: ConfigBuilder<DefaultState>,
        environment: Environment,
    ) -> Result<TreeGridConfig, TreeError> {
        let config: TreeGridConfig = environment::add_to_builder(builder, environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| TreeError::ConfigError(e.to_string()))?;
        config.validate().map_err(TreeError::ConfigError)?;
        Ok(config)
    }
}
