//! Logging System
//!
//! The engine only emits `tracing` events. Applications embedding it call
//! [`init_logging`] once to install a subscriber; environment variables
//! (`TREEGRID_LOG`, `TREEGRID_LOG_FORMAT`, `TREEGRID_LOG_OUTPUT`,
//! `TREEGRID_LOG_FILE`, `TREEGRID_LOG_MODULES`) take precedence over the
//! configuration, which takes precedence over defaults.

use crate::error::TreeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Event encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = TreeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(TreeError::ConfigError(format!(
                "Invalid log format: {} (expected text or json)",
                other
            ))),
        }
    }
}

/// Where events are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    /// stdout and stderr
    #[serde(rename = "both")]
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = TreeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(TreeError::ConfigError(format!(
                "Invalid log output: {} (expected stdout, stderr, file, file+stderr or both)",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Required when `output` writes to a file
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// ANSI colors for text output on a terminal stream
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module level overrides, e.g. `treegrid::store = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), TreeError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(install_error);
    }

    let filter = build_env_filter(config)?;
    let format = env_override("TREEGRID_LOG_FORMAT")
        .map(|raw| raw.parse())
        .transpose()?
        .unwrap_or(config.format);
    let output = env_override("TREEGRID_LOG_OUTPUT")
        .map(|raw| raw.parse())
        .transpose()?
        .unwrap_or(config.output);
    let file = env_override("TREEGRID_LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| config.file.clone());

    let writer = build_writer(output, file.as_deref())?;
    let use_color = config.color && !output.writes_file();

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(use_color)
            .with_writer(writer)
            .boxed(),
    };

    Registry::default()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(install_error)
}

fn install_error(err: impl std::fmt::Display) -> TreeError {
    TreeError::ConfigError(format!("Failed to install subscriber: {}", err))
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn build_writer(output: LogOutput, file: Option<&Path>) -> Result<BoxMakeWriter, TreeError> {
    let open_file = || -> Result<Mutex<File>, TreeError> {
        let path = file.ok_or_else(|| {
            TreeError::ConfigError("Log output includes file but no log file is set".to_string())
        })?;
        open_log_file(path).map(Mutex::new)
    };

    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        LogOutput::File => BoxMakeWriter::new(open_file()?),
        LogOutput::FileAndStderr => BoxMakeWriter::new(open_file()?.and(std::io::stderr)),
    })
}

fn open_log_file(path: &Path) -> Result<File, TreeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            TreeError::ConfigError(format!("Cannot create log directory {:?}: {}", parent, e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TreeError::ConfigError(format!("Cannot open log file {:?}: {}", path, e)))
}

/// `TREEGRID_LOG` replaces everything; otherwise the base level plus module
/// overrides from config and `TREEGRID_LOG_MODULES` (`module=level,...`).
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, TreeError> {
    if let Ok(filter) = EnvFilter::try_from_env("TREEGRID_LOG") {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        filter = filter.add_directive(module_directive(module, level)?);
    }
    if let Some(modules) = env_override("TREEGRID_LOG_MODULES") {
        for (module, level) in modules.split(',').filter_map(|spec| spec.split_once('=')) {
            filter = filter.add_directive(module_directive(module.trim(), level.trim())?);
        }
    }
    Ok(filter)
}

fn module_directive(module: &str, level: &str) -> Result<Directive, TreeError> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| TreeError::ConfigError(format!("Invalid log directive {}={}: {}", module, level, e)))
}
