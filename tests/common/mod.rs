//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use dataprep_rs::action::{ActionRegistry, ActionStep};
use dataprep_rs::config::RuntimeSettings;
use dataprep_rs::pipeline::{
    runtime_for, BuildOptions, CancelToken, ExecutionReport, PipelineBuilder, SinkSpec,
};
use dataprep_rs::source::{RowSource, VecSource};
use dataprep_rs::types::{Row, RowMetadata};
use std::sync::Arc;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Output of one collected run
#[derive(Debug)]
pub struct Collected {
    pub report: ExecutionReport,
    pub rows: Vec<Row>,
    pub metadata: Arc<RowMetadata>,
}

/// Build with `options`, run on `runtime` and collect the output
pub fn run_collect(
    registry: &ActionRegistry,
    steps: &[ActionStep],
    source: VecSource,
    options: BuildOptions,
    runtime: &RuntimeSettings,
) -> Collected {
    let mut source = source;
    let mut pipeline = PipelineBuilder::new(registry)
        .with_options(options)
        .build(steps, source.metadata().clone(), SinkSpec::Collector)
        .expect("pipeline should build");
    let report = runtime_for(runtime)
        .execute(&mut pipeline, &mut source, &CancelToken::new())
        .expect("execution should succeed");
    let (rows, metadata) = pipeline.take_collected().expect("pipeline has a collector");
    Collected {
        report,
        rows,
        metadata,
    }
}

/// Same as [`run_collect`] with the built-in actions and default options
pub fn run_default(steps: &[ActionStep], source: VecSource, runtime: &RuntimeSettings) -> Collected {
    run_collect(
        &ActionRegistry::builtin(),
        steps,
        source,
        BuildOptions::default(),
        runtime,
    )
}

/// Every row's populated column ids, in id order
pub fn populated_ids(row: &Row) -> Vec<String> {
    row.column_ids().map(str::to_string).collect()
}
