//! Engine settings sections
//!
//! Each section maps to a TOML table of the engine configuration file.
//!
//! # Main Types
//!
//! - [`RuntimeSettings`] - Which runtime executes pipelines and how it batches
//! - [`PipelineSettings`] - Default build options (invalid detection, statistics, limit)
//! - [`StatisticsSettings`] - Which statistics tables are computed
//! - [`LoggingSettings`] - Log filter and optional log file

use super::{DEFAULT_BATCH_SIZE, DEFAULT_PARTITIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which runtime executes a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    /// Single-threaded, depth-first, streaming
    #[default]
    Sequential,
    /// Partition-parallel over the whole dataset
    Batch,
}

impl RuntimeKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeKind::Sequential => "sequential",
            RuntimeKind::Batch => "batch",
        }
    }

    /// Get all runtime kinds
    pub fn all() -> &'static [RuntimeKind] {
        &[RuntimeKind::Sequential, RuntimeKind::Batch]
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuntimeKind::all()
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown runtime '{}'", s))
    }
}

/// Runtime selection and tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime to use
    pub kind: RuntimeKind,

    /// Rows pulled from the source per delivery (sequential runtime)
    pub batch_size: usize,

    /// Number of contiguous partitions (batch runtime)
    pub partitions: usize,

    /// Worker thread cap for the batch runtime; `None` uses the global pool
    pub max_threads: Option<usize>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            kind: RuntimeKind::Sequential,
            batch_size: DEFAULT_BATCH_SIZE,
            partitions: DEFAULT_PARTITIONS,
            max_threads: None,
        }
    }
}

impl RuntimeSettings {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn batch(partitions: usize) -> Self {
        Self {
            kind: RuntimeKind::Batch,
            partitions,
            ..Self::default()
        }
    }

    /// Batch size, never zero
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Partition count, never zero
    pub fn effective_partitions(&self) -> usize {
        self.partitions.max(1)
    }
}

/// Which statistics tables are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Value frequency table
    pub frequencies: bool,
    /// Pattern frequency table
    pub patterns: bool,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            frequencies: true,
            patterns: true,
        }
    }
}

/// Default pipeline build options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Flag invalid cells before the actions and after the last one
    pub detect_invalid: bool,

    /// Compute final quality and statistics
    pub compute_statistics: bool,

    /// Only process the first N rows
    pub limit: Option<u64>,

    /// Statistics tables
    pub statistics: StatisticsSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            detect_invalid: true,
            compute_statistics: true,
            limit: None,
            statistics: StatisticsSettings::default(),
        }
    }
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is not set
    pub filter: String,

    /// Optional log file, written in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}
