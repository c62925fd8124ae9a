//! Match-based traversal of a pipeline graph.
//!
//! - [`walk`] visits nodes depth first from the source, following links
//! - [`dump`] renders the graph as deterministic text
//! - [`shallow_copy`] builds a fresh, unexecuted graph with the same layout
//! - [`partition_copies`] splits one node for the batch runtime

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::id::NodeId;
use crate::pipeline::link::Link;
use crate::pipeline::node::{Node, NodeSlot};
use crate::pipeline::nodes::{LimitNode, SortNode};
use std::fmt::Write;

/// Visit every node reachable from the source once, depth first.
///
/// `visit` gets the slot and its depth; zip targets are reached through
/// their join and visited on first arrival.
pub fn walk(pipeline: &Pipeline, mut visit: impl FnMut(&NodeSlot, usize)) {
    let mut seen = vec![false; pipeline.len()];
    let mut stack = vec![(pipeline.source(), 0usize)];

    while let Some((id, depth)) = stack.pop() {
        let Some(slot) = pipeline.nodes().get(id.index()) else {
            continue;
        };
        if std::mem::replace(&mut seen[id.index()], true) {
            continue;
        }
        visit(slot, depth);

        let next: Vec<NodeId> = match &slot.link {
            None => Vec::new(),
            Some(Link::Basic(to)) => vec![*to],
            Some(Link::Clone(targets)) => targets.clone(),
            Some(Link::Zip { join, .. }) => pipeline
                .joins()
                .get(join.index())
                .map(|j| vec![j.target()])
                .unwrap_or_default(),
        };
        // Reversed so the first target is visited first
        for to in next.into_iter().rev() {
            stack.push((to, depth + 1));
        }
    }
}

fn describe_link(pipeline: &Pipeline, link: Option<&Link>) -> String {
    match link {
        None => String::new(),
        Some(Link::Basic(to)) => format!(" -> {}", to.0),
        Some(Link::Clone(targets)) => format!(
            " => [{}]",
            targets
                .iter()
                .map(|t| t.0.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Some(Link::Zip { join, side }) => {
            let target = pipeline
                .joins()
                .get(join.index())
                .map(|j| j.target().0.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!(" ~> {} (zip side {})", target, side)
        }
    }
}

/// Text rendering of the graph, one node per line, indented by depth.
///
/// Two graphs built from the same input dump to the same text.
pub fn dump(pipeline: &Pipeline) -> String {
    let mut out = String::new();
    let mut seen = vec![false; pipeline.len()];

    walk(pipeline, |slot, depth| {
        seen[slot.id().index()] = true;
        let _ = writeln!(
            out,
            "{}{}: {}{}",
            "  ".repeat(depth),
            slot.id().0,
            slot.node().describe(),
            describe_link(pipeline, slot.link())
        );
    });

    for slot in pipeline.nodes().iter().filter(|s| !seen[s.id().index()]) {
        let _ = writeln!(
            out,
            "{}: {} (unreachable){}",
            slot.id().0,
            slot.node().describe(),
            describe_link(pipeline, slot.link())
        );
    }
    out
}

fn fresh_node(id: NodeId, node: &Node) -> PipelineResult<Node> {
    Ok(match node {
        Node::Action(n) => Node::Action(n.fresh_copy()),
        Node::Limit(n) => Node::Limit(LimitNode::new(n.limit())),
        Node::Sort(n) => Node::Sort(SortNode::new(n.spec().clone())),
        Node::Collector(n) => Node::Collector(n.fresh_copy()),
        Node::Statistics(n) => Node::Statistics(n.partition_copy()),
        Node::Writer(_) => return Err(PipelineError::NotCopyable(id)),
        other => match other.partition_copy() {
            Some(copy) => copy,
            None => return Err(PipelineError::NotCopyable(id)),
        },
    })
}

/// Fresh graph with the same nodes, links and compiled actions.
///
/// Node state is not carried over; actions keep their compiled context
/// and are not compiled again. Writer sinks own their output stream and
/// cannot be copied.
pub fn shallow_copy(pipeline: &Pipeline) -> PipelineResult<Pipeline> {
    let mut copy = Pipeline::new(pipeline.schema().clone());
    for slot in pipeline.nodes() {
        let node = fresh_node(slot.id(), slot.node())?;
        copy.add_node(node);
    }
    for (slot, target) in pipeline.nodes().iter().zip(copy.nodes.iter_mut()) {
        target.link = slot.link.clone();
    }
    copy.joins = pipeline.joins().iter().map(|j| j.reset()).collect();
    if pipeline.source().is_valid() {
        copy.set_source(pipeline.source())?;
    }
    Ok(copy)
}

/// One copy of node `id` per partition, or `None` when the node has to
/// see the whole dataset.
pub fn partition_copies(pipeline: &Pipeline, id: NodeId, partitions: usize) -> Option<Vec<Node>> {
    let node = pipeline.node(id)?;
    (0..partitions).map(|_| node.partition_copy()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::{BasicNode, CollectorNode, SourceNode};
    use crate::types::RowMetadata;
    use std::sync::Arc;

    fn graph() -> Pipeline {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let mut p = Pipeline::new(md.clone());
        let source = p.add_node(Node::Source(SourceNode::new(md.clone())));
        let a = p.add_node(Node::Basic(BasicNode::new("reference")));
        let b = p.add_node(Node::Basic(BasicNode::new("preview")));
        let sink_a = p.add_node(Node::Collector(CollectorNode::new(md.clone(), false)));
        let sink_b = p.add_node(Node::Collector(CollectorNode::new(md.clone(), false)));
        p.add_node(Node::Basic(BasicNode::new("orphan")));
        p.set_source(source).unwrap();
        p.clone_to(source, vec![a, b]).unwrap();
        p.connect(a, sink_a).unwrap();
        p.connect(b, sink_b).unwrap();
        p
    }

    #[test]
    fn test_walk_is_depth_first() {
        let p = graph();
        let mut order = Vec::new();
        walk(&p, |slot, depth| order.push((slot.id().0, depth)));
        assert_eq!(order, vec![(0, 0), (1, 1), (3, 2), (2, 1), (4, 2)]);
    }

    #[test]
    fn test_dump() {
        let text = dump(&graph());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0: Source(1 columns) => [1, 2]");
        assert_eq!(lines[1], "  1: Basic(reference) -> 3");
        assert_eq!(lines[5], "5: Basic(orphan) (unreachable)");
    }

    #[test]
    fn test_shallow_copy_is_unexecuted() {
        let mut p = graph();
        p.begin().unwrap();
        let copy = shallow_copy(&p).unwrap();
        assert!(!copy.is_executed());
        assert_eq!(dump(&copy), dump(&p));
    }

    #[test]
    fn test_partition_copies() {
        let p = graph();
        assert_eq!(partition_copies(&p, NodeId(1), 3).map(|c| c.len()), Some(3));
        assert!(partition_copies(&p, NodeId(3), 3).is_none());
    }
}
