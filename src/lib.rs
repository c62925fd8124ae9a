//! # dataprep-rs: row transformation pipeline engine
//!
//! Applies an ordered list of transformation actions to a single-pass
//! stream of tabular rows, producing transformed rows plus updated column
//! metadata (types, quality counters, value statistics).
//!
//! ## Architecture
//!
//! - **Model**: rows as owned values, column metadata shared through `Arc`
//! - **Actions**: the `Action` contract, behaviors, parameters and an
//!   injectable registry with a small set of reference actions
//! - **Pipeline**: a graph of typed nodes linked by basic, clone and zip
//!   links, built from an action list and compiled into an execution order
//! - **Runtimes**: a sequential runtime and a partition-parallel batch
//!   runtime on rayon, with identical output
//! - **Boundaries**: row sources, row writers and a metadata cache as traits,
//!   with in-memory and JSON-lines implementations
//!
//! ## Configuration
//!
//! Engine settings are read from `engine.toml` in the platform config
//! directory under `dataprep-rs`:
//!
//! - **Linux**: `~/.config/dataprep-rs/engine.toml`
//! - **macOS**: `~/Library/Application Support/dataprep-rs/engine.toml`
//! - **Windows**: `%APPDATA%\dataprep-rs\engine.toml`
//!
//! ## Example
//!
//! ```ignore
//! use dataprep_rs::{
//!     action::{parse_steps, ActionRegistry},
//!     config::EngineConfig,
//!     pipeline::{runtime_for, BuildOptions, CancelToken, PipelineBuilder, SinkSpec},
//!     source::{RowSource, VecSource},
//! };
//!
//! let config = EngineConfig::load_or_default(None);
//! let registry = ActionRegistry::builtin();
//! let steps = parse_steps(r#"[{"action":"uppercase","parameters":{"column_id":"0000"}}]"#)?;
//! let mut source = VecSource::from_values(&["name"], &[vec!["ada"]]);
//!
//! let mut pipeline = PipelineBuilder::new(&registry)
//!     .with_options(BuildOptions::from_settings(&config.pipeline))
//!     .build(&steps, source.metadata().clone(), SinkSpec::Collector)?;
//! let report = runtime_for(&config.runtime).execute(&mut pipeline, &mut source, &CancelToken::new())?;
//! let (rows, metadata) = pipeline.take_collected().unwrap();
//! ```

pub mod action;
pub mod actions;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use action::{Action, ActionRegistry, ActionStep, Parameters};
pub use config::EngineConfig;
pub use error::{PrepError, Result, ResultExt};
pub use pipeline::{
    runtime_for, BuildOptions, CancelToken, ExecutionReport, Pipeline, PipelineBuilder, SinkSpec,
};
pub use types::{ColumnMetadata, DataType, Row, RowMetadata};
