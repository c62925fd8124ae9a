//! Configuration module for dataprep-rs
//!
//! The engine is configured from a single TOML file with three tables:
//!
//! ```toml
//! [runtime]
//! kind = "batch"        # or "sequential"
//! batch_size = 64
//! partitions = 4
//! max_threads = 8
//!
//! [pipeline]
//! detect_invalid = true
//! compute_statistics = true
//! limit = 1000
//!
//! [pipeline.statistics]
//! frequencies = true
//! patterns = false
//!
//! [logging]
//! filter = "info"
//! file = "dataprep.log"
//! ```
//!
//! Every field is optional; missing fields take their defaults.
//!
//! # Config Location
//!
//! The default file lives in the platform config directory:
//! - **Linux**: `~/.config/dataprep-rs/engine.toml`
//! - **macOS**: `~/Library/Application Support/dataprep-rs/engine.toml`
//! - **Windows**: `%APPDATA%\dataprep-rs\engine.toml`

pub mod settings;

pub use settings::*;

use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dataprep-rs";

/// Engine config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Default number of rows pulled per delivery
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default number of partitions for the batch runtime
pub const DEFAULT_PARTITIONS: usize = 4;

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default engine config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub runtime: RuntimeSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PrepError::Config(format!("Failed to parse engine config: {}", e)))
    }

    /// Render this config as TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PrepError::Config(format!("Failed to serialize engine config: {}", e)))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!("Failed to read engine config {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Load the config at `path`, or the default location when `None`.
    ///
    /// A missing default file yields the defaults; any other failure is
    /// logged and also yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save this config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PrepError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| {
            PrepError::Config(format!("Failed to write engine config {:?}: {}", path, e))
        })
    }
}
