//! Execution backends.
//!
//! Both runtimes drive the same graph and produce the same output:
//! - [`SequentialRuntime`] pulls rows in batches and pushes them through
//!   the graph depth first, on the calling thread
//! - [`BatchRuntime`] reads the whole source, splits it into partitions
//!   and runs partition-safe nodes in parallel on a rayon pool
//!
//! The runtime is chosen from [`RuntimeSettings`] with [`runtime_for`].

mod batch;
mod sequential;

pub use batch::BatchRuntime;
pub use sequential::SequentialRuntime;

use crate::config::{RuntimeKind, RuntimeSettings};
use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::error::PipelineError;
use crate::pipeline::graph::Pipeline;
use crate::pipeline::packet::Signal;
use crate::pipeline::report::{ExecutionFailure, ExecutionReport, Outcome};
use crate::source::RowSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Strategy executing a built pipeline over a row source.
pub trait Runtime: Send {
    fn kind(&self) -> RuntimeKind;

    /// Run `pipeline` over every row of `source`.
    ///
    /// A graph executes once; a second call fails with `AlreadyExecuted`.
    fn execute(
        &self,
        pipeline: &mut Pipeline,
        source: &mut dyn RowSource,
        cancel: &CancelToken,
    ) -> Result<ExecutionReport, ExecutionFailure>;
}

/// Runtime selected by configuration
pub fn runtime_for(settings: &RuntimeSettings) -> Box<dyn Runtime> {
    match settings.kind {
        RuntimeKind::Sequential => Box::new(SequentialRuntime::new(settings.clone())),
        RuntimeKind::Batch => Box::new(BatchRuntime::new(settings.clone())),
    }
}

/// Report of the run so far
fn report(pipeline: &Pipeline, kind: RuntimeKind, outcome: Outcome, started: Instant) -> ExecutionReport {
    ExecutionReport {
        outcome,
        rows_read: pipeline.rows_read(),
        actions: pipeline.action_reports(),
        elapsed: started.elapsed(),
        ..ExecutionReport::new(kind)
    }
}

/// Close what is still open and turn `error` into a failure.
///
/// A cancellation closes the graph with `Cancel`, a fatal error too; the
/// outcome tells them apart.
fn fail(
    pipeline: &mut Pipeline,
    plan: Option<&CompiledPlan>,
    kind: RuntimeKind,
    error: PipelineError,
    started: Instant,
) -> ExecutionFailure {
    if let Some(plan) = plan {
        pipeline.close_open(plan, Signal::Cancel);
    }
    let outcome = if matches!(error, PipelineError::Cancelled) {
        info!("Execution cancelled");
        Outcome::Cancelled
    } else {
        warn!("Execution failed: {}", error);
        Outcome::Failed
    };
    ExecutionFailure::new(error, report(pipeline, kind, outcome, started))
}

/// Every planned node must have seen its terminal signal
fn check_closed(pipeline: &Pipeline, plan: &CompiledPlan) -> Result<(), PipelineError> {
    let open = pipeline.open_nodes(plan);
    if open.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Runtime(format!(
            "nodes {:?} did not receive end-of-stream",
            open
        )))
    }
}
