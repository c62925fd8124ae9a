//! In-process runtime: single thread, rows pushed depth first.

use super::{check_closed, fail, report, CancelToken, Runtime};
use crate::config::{RuntimeKind, RuntimeSettings};
use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::report::{ExecutionFailure, ExecutionReport, Outcome};
use crate::source::RowSource;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pulls `batch_size` rows at a time and delivers them through the graph.
///
/// The cancel token is checked before each pull. Pulling stops early once
/// a limit right after the source lets nothing more through.
#[derive(Debug, Clone, Default)]
pub struct SequentialRuntime {
    settings: RuntimeSettings,
}

impl SequentialRuntime {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self { settings }
    }

    fn run(
        &self,
        pipeline: &mut Pipeline,
        plan: &CompiledPlan,
        source: &mut dyn RowSource,
        cancel: &CancelToken,
    ) -> PipelineResult<()> {
        let schema = pipeline.schema().clone();
        let source_id = pipeline.source();
        let batch_size = self.settings.effective_batch_size();
        let mut batch = Vec::with_capacity(batch_size);
        let mut exhausted = false;

        while !exhausted {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if pipeline.source_saturated() {
                debug!("Limit reached, no more rows pulled");
                break;
            }
            while batch.len() < batch_size {
                match source.next_row() {
                    Some(row) => batch.push(Packet::row(row?, schema.clone())),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            pipeline.deliver_all(source_id, batch.drain(..))?;
        }

        pipeline.deliver(source_id, Packet::Signal(Signal::EndOfStream))?;
        check_closed(pipeline, plan)
    }
}

impl Runtime for SequentialRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Sequential
    }

    fn execute(
        &self,
        pipeline: &mut Pipeline,
        source: &mut dyn RowSource,
        cancel: &CancelToken,
    ) -> Result<ExecutionReport, ExecutionFailure> {
        let started = Instant::now();
        let kind = self.kind();
        let plan = match pipeline.begin() {
            Ok(plan) => plan,
            Err(e) => return Err(fail(pipeline, None, kind, e, started)),
        };
        if source.metadata() != pipeline.schema().as_ref() {
            warn!("Row source schema differs from the schema the pipeline was built for");
        }

        match self.run(pipeline, &plan, source, cancel) {
            Ok(()) => {
                let report = report(pipeline, kind, Outcome::Completed, started);
                info!(
                    "Sequential execution completed: {} rows in {} ms",
                    report.rows_read,
                    report.elapsed.as_millis()
                );
                Ok(report)
            }
            Err(e) => Err(fail(pipeline, Some(&plan), kind, e, started)),
        }
    }
}
