//! Cancellation, failure and terminal signal delivery

mod common;

use common::builders::{DatasetBuilder, StepBuilder};
use common::{run_default, test_timeout};
use dataprep_rs::action::{ActionRegistry, ActionStep};
use dataprep_rs::config::RuntimeSettings;
use dataprep_rs::pipeline::{
    runtime_for, visit, CancelToken, ExecutionHandle, NodeKind, NodeState, Outcome, Packet,
    Pipeline, PipelineBuilder, PipelineError, Signal, SinkSpec,
};
use dataprep_rs::source::{RowSource, VecSource};
use dataprep_rs::types::{Row, RowMetadata};
use std::io;
use std::time::Duration;

/// Cancels `token` once `after` rows were handed out
struct CancellingSource {
    inner: VecSource,
    token: CancelToken,
    after: usize,
    served: usize,
}

impl RowSource for CancellingSource {
    fn metadata(&self) -> &RowMetadata {
        self.inner.metadata()
    }

    fn next_row(&mut self) -> Option<io::Result<Row>> {
        self.served += 1;
        if self.served > self.after {
            self.token.cancel();
        }
        self.inner.next_row()
    }
}

/// Fails on the third row
struct BrokenSource {
    inner: VecSource,
    served: usize,
}

impl RowSource for BrokenSource {
    fn metadata(&self) -> &RowMetadata {
        self.inner.metadata()
    }

    fn next_row(&mut self) -> Option<io::Result<Row>> {
        self.served += 1;
        if self.served == 3 {
            return Some(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")));
        }
        self.inner.next_row()
    }
}

/// Endless, slow source
struct Trickle {
    metadata: RowMetadata,
    next: u64,
}

impl RowSource for Trickle {
    fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> Option<io::Result<Row>> {
        std::thread::sleep(Duration::from_millis(1));
        self.next += 1;
        Some(Ok(Row::new(self.next).with("0000", "x")))
    }
}

fn dataset(n: usize) -> VecSource {
    let values: Vec<String> = (0..n).map(|i| format!("v{}", i)).collect();
    let refs: Vec<&str> = values.iter().map(String::as_str).collect();
    DatasetBuilder::column("value", &refs).build()
}

fn steps() -> Vec<ActionStep> {
    vec![StepBuilder::new("uppercase").column("0000").build()]
}

fn build(registry: &ActionRegistry, metadata: &RowMetadata) -> Pipeline {
    PipelineBuilder::new(registry)
        .build(&steps(), metadata.clone(), SinkSpec::Collector)
        .unwrap()
}

fn reachable_states(pipeline: &Pipeline) -> Vec<NodeState> {
    let mut states = Vec::new();
    visit::walk(pipeline, |slot, _| states.push(slot.state()));
    states
}

#[test]
fn test_completed_run_closes_every_node_once() {
    for runtime in [RuntimeSettings::sequential(), RuntimeSettings::batch(3)] {
        let registry = ActionRegistry::builtin();
        let mut source = dataset(10);
        let mut pipeline = build(&registry, source.metadata());

        runtime_for(&runtime)
            .execute(&mut pipeline, &mut source, &CancelToken::new())
            .unwrap();

        let states = reachable_states(&pipeline);
        assert_eq!(states.len(), pipeline.len());
        assert!(states
            .iter()
            .all(|s| *s == NodeState::Closed(Signal::EndOfStream)));
    }
}

#[test]
fn test_cancel_mid_run() {
    for runtime in [RuntimeSettings::sequential(), RuntimeSettings::batch(2)] {
        let registry = ActionRegistry::builtin();
        let token = CancelToken::new();
        let inner = dataset(50);
        let mut pipeline = build(&registry, inner.metadata());
        let mut source = CancellingSource {
            inner,
            token: token.clone(),
            after: 5,
            served: 0,
        };

        let runtime = RuntimeSettings {
            batch_size: 2,
            ..runtime
        };
        let failure = runtime_for(&runtime)
            .execute(&mut pipeline, &mut source, &token)
            .unwrap_err();

        assert!(failure.is_cancelled());
        assert_eq!(failure.report.outcome, Outcome::Cancelled);
        assert!(reachable_states(&pipeline)
            .iter()
            .all(|s| *s == NodeState::Closed(Signal::Cancel)));
        let (rows, _) = pipeline.take_collected().unwrap();
        assert!(rows.is_empty());
    }
}

#[test]
fn test_stop_between_rows_reaches_every_node() {
    let registry = ActionRegistry::builtin();
    let source = dataset(6);
    let steps = vec![
        StepBuilder::new("delete_all_empty_columns").build(),
        StepBuilder::new("uppercase").column("0000").build(),
    ];
    let mut pipeline = PipelineBuilder::new(&registry)
        .build(&steps, source.metadata().clone(), SinkSpec::Collector)
        .unwrap();
    assert!(pipeline
        .nodes()
        .iter()
        .any(|slot| slot.node().kind() == NodeKind::Statistics));

    pipeline.begin().unwrap();
    let entry = pipeline.source();
    for id in 1..=3 {
        let packet = Packet::row(Row::new(id).with("0000", "v"), pipeline.schema().clone());
        pipeline.deliver(entry, packet).unwrap();
    }
    pipeline.deliver(entry, Packet::Signal(Signal::Stop)).unwrap();

    let states = reachable_states(&pipeline);
    assert_eq!(states.len(), pipeline.len());
    assert!(states.iter().all(|s| *s == NodeState::Closed(Signal::Stop)));
    let (rows, _) = pipeline.take_collected().unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_cancel_before_start() {
    let registry = ActionRegistry::builtin();
    let mut source = dataset(3);
    let mut pipeline = build(&registry, source.metadata());
    let token = CancelToken::new();
    token.cancel();

    let failure = runtime_for(&RuntimeSettings::sequential())
        .execute(&mut pipeline, &mut source, &token)
        .unwrap_err();
    assert_eq!(failure.report.outcome, Outcome::Cancelled);
    assert_eq!(failure.report.rows_read, 0);
}

#[test]
fn test_source_error_fails_the_run() {
    for runtime in [RuntimeSettings::sequential(), RuntimeSettings::batch(2)] {
        let registry = ActionRegistry::builtin();
        let inner = dataset(10);
        let mut pipeline = build(&registry, inner.metadata());
        let mut source = BrokenSource { inner, served: 0 };

        let failure = runtime_for(&runtime)
            .execute(&mut pipeline, &mut source, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::Resource(_)));
        assert_eq!(failure.report.outcome, Outcome::Failed);
        assert!(reachable_states(&pipeline).iter().all(NodeState::is_closed));
    }
}

#[test]
fn test_pipeline_runs_only_once() {
    let registry = ActionRegistry::builtin();
    let mut source = dataset(2);
    let mut pipeline = build(&registry, source.metadata());
    let runtime = runtime_for(&RuntimeSettings::sequential());

    runtime
        .execute(&mut pipeline, &mut source, &CancelToken::new())
        .unwrap();
    assert!(pipeline.is_executed());

    let failure = runtime
        .execute(&mut pipeline, &mut dataset(2), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(failure.error, PipelineError::AlreadyExecuted));
}

#[test]
fn test_shallow_copy_runs_again() {
    let registry = ActionRegistry::builtin();
    let mut source = dataset(4);
    let mut pipeline = build(&registry, source.metadata());
    let runtime = runtime_for(&RuntimeSettings::sequential());

    runtime
        .execute(&mut pipeline, &mut source, &CancelToken::new())
        .unwrap();
    let (first, _) = pipeline.take_collected().unwrap();

    let mut copy = visit::shallow_copy(&pipeline).unwrap();
    assert!(!copy.is_executed());
    assert_eq!(visit::dump(&copy), visit::dump(&pipeline));

    runtime
        .execute(&mut copy, &mut dataset(4), &CancelToken::new())
        .unwrap();
    let (second, _) = copy.take_collected().unwrap();
    assert_eq!(first, second);

    let expected = run_default(&steps(), dataset(4), &RuntimeSettings::sequential());
    assert_eq!(second, expected.rows);
}

#[test]
fn test_handle_cancels_endless_run() {
    let metadata = RowMetadata::from_names(&["value"]);
    let registry = ActionRegistry::builtin();
    let pipeline = build(&registry, &metadata);
    let source = Trickle { metadata, next: 0 };

    let mut handle = ExecutionHandle::spawn(
        runtime_for(&RuntimeSettings {
            batch_size: 4,
            ..RuntimeSettings::sequential()
        }),
        pipeline,
        Box::new(source),
    )
    .unwrap();

    assert!(handle.try_wait(test_timeout()).unwrap().is_none());
    handle.cancel();

    let finished = handle.wait().unwrap();
    let failure = finished.result.unwrap_err();
    assert!(failure.is_cancelled());
    assert!(failure.report.rows_read > 0);
}
