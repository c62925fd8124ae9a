//! Thread boundary between the caller and a running execution.
//!
//! `ExecutionHandle::spawn` moves a pipeline and its row source onto a
//! dedicated thread. The caller can cancel the run, poll for completion or
//! block on it; the result comes back over a crossbeam channel together
//! with the pipeline, so collected rows and node state stay inspectable.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::report::{ExecutionFailure, ExecutionReport};
use crate::pipeline::runtime::{CancelToken, Runtime};
use crate::source::RowSource;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// What a finished execution hands back.
#[derive(Debug)]
pub struct Finished {
    pub result: Result<ExecutionReport, ExecutionFailure>,
    pub pipeline: Pipeline,
}

/// Caller-side handle of an execution running on its own thread.
pub struct ExecutionHandle {
    cancel: CancelToken,
    result_rx: Receiver<Finished>,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionHandle {
    /// Start executing `pipeline` over `source` on a new thread.
    pub fn spawn(
        runtime: Box<dyn Runtime>,
        mut pipeline: Pipeline,
        mut source: Box<dyn RowSource>,
    ) -> PipelineResult<Self> {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let (result_tx, result_rx) = bounded(1);

        let thread = std::thread::Builder::new()
            .name(format!("dataprep-{}", runtime.kind()))
            .spawn(move || {
                let result = runtime.execute(&mut pipeline, source.as_mut(), &token);
                if result_tx.send(Finished { result, pipeline }).is_err() {
                    debug!("Execution result dropped, handle is gone");
                }
            })?;

        Ok(Self {
            cancel,
            result_rx,
            thread: Some(thread),
        })
    }

    /// Ask the execution to stop; it finishes with a cancelled outcome
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wait up to `timeout` for the execution to finish.
    ///
    /// `Ok(None)` when it is still running.
    pub fn try_wait(&mut self, timeout: Duration) -> PipelineResult<Option<Finished>> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(finished) => {
                self.join();
                Ok(Some(finished))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.join();
                Err(PipelineError::ChannelRecv)
            }
        }
    }

    /// Block until the execution finishes
    pub fn wait(mut self) -> PipelineResult<Finished> {
        let finished = self
            .result_rx
            .recv()
            .map_err(|_| PipelineError::ChannelRecv);
        self.join();
        finished
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Execution thread panicked");
            }
        }
    }
}

impl Drop for ExecutionHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
            self.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionRegistry, ActionStep, Parameters};
    use crate::config::RuntimeSettings;
    use crate::pipeline::builder::{PipelineBuilder, SinkSpec};
    use crate::pipeline::runtime::runtime_for;
    use crate::source::VecSource;

    #[test]
    fn test_wait_returns_pipeline_and_report() {
        let source = VecSource::from_values(&["name"], &[vec!["ada"], vec!["bob"]]);
        let registry = ActionRegistry::builtin();
        let steps = vec![ActionStep::new(
            "uppercase",
            Parameters::new().with("column_id", "0000"),
        )];
        let pipeline = PipelineBuilder::new(&registry)
            .build(&steps, source.metadata().clone(), SinkSpec::Collector)
            .unwrap();

        let handle = ExecutionHandle::spawn(
            runtime_for(&RuntimeSettings::sequential()),
            pipeline,
            Box::new(source),
        )
        .unwrap();
        let mut finished = handle.wait().unwrap();
        let report = finished.result.unwrap();
        assert_eq!(report.rows_read, 2);

        let (rows, _) = finished.pipeline.take_collected().unwrap();
        assert_eq!(rows[1].get("0000"), Some("BOB"));
    }
}
