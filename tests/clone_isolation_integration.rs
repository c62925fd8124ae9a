//! Branches fed by a clone link never see each other's edits

mod common;

use common::builders::DatasetBuilder;
use dataprep_rs::action::{ActionRegistry, Parameters};
use dataprep_rs::config::RuntimeSettings;
use dataprep_rs::pipeline::nodes::{ActionNode, CollectorNode, SourceNode};
use dataprep_rs::pipeline::{runtime_for, Branch, CancelToken, Node, NodeId, Pipeline};
use dataprep_rs::source::RowSource;
use dataprep_rs::types::Row;
use std::sync::Arc;

struct Forked {
    pipeline: Pipeline,
    edited: NodeId,
    untouched: NodeId,
}

/// source => [uppercase -> collector, collector]
fn forked(metadata: &dataprep_rs::types::RowMetadata) -> Forked {
    let registry = ActionRegistry::builtin();
    let md = Arc::new(metadata.clone());
    let mut pipeline = Pipeline::new(md.clone());

    let source = pipeline.add_node(Node::Source(SourceNode::new(md.clone())));
    let (action, _) = ActionNode::compile(
        0,
        Branch::Main,
        registry.resolve("uppercase").unwrap(),
        Parameters::new().with("column_id", "0000"),
        metadata,
    );
    let action = pipeline.add_node(Node::Action(action));
    let edited = pipeline.add_node(Node::Collector(CollectorNode::new(md.clone(), false)));
    let untouched = pipeline.add_node(Node::Collector(CollectorNode::new(md, false)));

    pipeline.set_source(source).unwrap();
    pipeline.clone_to(source, vec![action, untouched]).unwrap();
    pipeline.connect(action, edited).unwrap();

    Forked {
        pipeline,
        edited,
        untouched,
    }
}

fn collected(pipeline: &Pipeline, id: NodeId) -> Vec<Row> {
    match pipeline.node(id) {
        Some(Node::Collector(collector)) => collector.rows().to_vec(),
        other => panic!("expected a collector, got {:?}", other),
    }
}

fn values(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r.get("0000").unwrap_or("")).collect()
}

#[test]
fn test_edits_stay_on_their_branch() {
    for runtime in [RuntimeSettings::sequential(), RuntimeSettings::batch(2)] {
        let mut source = DatasetBuilder::column("name", &["ada", "bob", "eve"]).build();
        let mut fork = forked(source.metadata());

        runtime_for(&runtime)
            .execute(&mut fork.pipeline, &mut source, &CancelToken::new())
            .unwrap();

        assert_eq!(
            values(&collected(&fork.pipeline, fork.edited)),
            vec!["ADA", "BOB", "EVE"]
        );
        assert_eq!(
            values(&collected(&fork.pipeline, fork.untouched)),
            vec!["ada", "bob", "eve"]
        );
    }
}

#[test]
fn test_both_branches_see_every_row_in_order() {
    let mut source = DatasetBuilder::column("n", &["1", "2", "3", "4", "5"]).build();
    let mut fork = forked(source.metadata());

    runtime_for(&RuntimeSettings::sequential())
        .execute(&mut fork.pipeline, &mut source, &CancelToken::new())
        .unwrap();

    let ids = |id| -> Vec<u64> { collected(&fork.pipeline, id).iter().map(|r| r.id).collect() };
    assert_eq!(ids(fork.edited), vec![1, 2, 3, 4, 5]);
    assert_eq!(ids(fork.untouched), vec![1, 2, 3, 4, 5]);
}
