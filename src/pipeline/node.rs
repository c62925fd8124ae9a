//! Node abstraction for the pipeline.
//!
//! Two layers:
//! - **`Node` enum**: closed sum over the built-in node kinds. Dispatch is
//!   a match per call, no dynamic dispatch on the hot path.
//! - **`NodeSlot`**: owns a node, its outgoing link and its lifecycle
//!   state (`Created → Receiving → Signaled → Closed`). The slot enforces
//!   the signal contract so that node implementations don't have to: a
//!   node sees at most one terminal signal, and nothing after it.

use crate::pipeline::error::PipelineError;
use crate::pipeline::id::NodeId;
use crate::pipeline::link::Link;
use crate::pipeline::node_type::NodeKind;
use crate::pipeline::nodes::{
    ActionNode, BasicNode, CollectorNode, DiffNode, EnforceNode, InvalidDetectionNode, LimitNode,
    SortNode, SourceNode, StatisticsMode, StatisticsNode, WriterNode,
};
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;
use tracing::{trace, warn};

/// How the batch runtime may run a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// One copy per partition, absorbed back in partition order.
    Partitioned,
    /// The whole ordered dataset through the node itself.
    Sequential,
}

/// Enum dispatch for built-in nodes.
#[derive(Debug)]
pub enum Node {
    Source(SourceNode),
    Basic(BasicNode),
    Action(ActionNode),
    Statistics(StatisticsNode),
    InvalidDetection(InvalidDetectionNode),
    Enforce(EnforceNode),
    Limit(LimitNode),
    Sort(SortNode),
    Diff(DiffNode),
    Collector(CollectorNode),
    Writer(WriterNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Source(n) => n.name(),
            Node::Basic(n) => n.name(),
            Node::Action(n) => n.name(),
            Node::Statistics(n) => n.name(),
            Node::InvalidDetection(n) => n.name(),
            Node::Enforce(n) => n.name(),
            Node::Limit(n) => n.name(),
            Node::Sort(n) => n.name(),
            Node::Diff(n) => n.name(),
            Node::Collector(n) => n.name(),
            Node::Writer(n) => n.name(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Source(_) => NodeKind::Source,
            Node::Basic(_) => NodeKind::Basic,
            Node::Action(_) => NodeKind::Action,
            Node::Statistics(_) => NodeKind::Statistics,
            Node::InvalidDetection(_) => NodeKind::InvalidDetection,
            Node::Enforce(_) => NodeKind::Enforce,
            Node::Limit(_) => NodeKind::Limit,
            Node::Sort(_) => NodeKind::Sort,
            Node::Diff(_) => NodeKind::Diff,
            Node::Collector(_) => NodeKind::Collector,
            Node::Writer(_) => NodeKind::Writer,
        }
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match self {
            Node::Source(n) => n.receive(packet, out),
            Node::Basic(n) => n.receive(packet, out),
            Node::Action(n) => n.receive(packet, out),
            Node::Statistics(n) => n.receive(packet, out),
            Node::InvalidDetection(n) => n.receive(packet, out),
            Node::Enforce(n) => n.receive(packet, out),
            Node::Limit(n) => n.receive(packet, out),
            Node::Sort(n) => n.receive(packet, out),
            Node::Diff(n) => n.receive(packet, out),
            Node::Collector(n) => n.receive(packet, out),
            Node::Writer(n) => n.receive(packet, out),
        }
    }

    pub fn on_signal(&mut self, signal: Signal, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match self {
            Node::Source(n) => n.on_signal(signal, out),
            Node::Basic(n) => n.on_signal(signal, out),
            Node::Action(n) => n.on_signal(signal, out),
            Node::Statistics(n) => n.on_signal(signal, out),
            Node::InvalidDetection(n) => n.on_signal(signal, out),
            Node::Enforce(n) => n.on_signal(signal, out),
            Node::Limit(n) => n.on_signal(signal, out),
            Node::Sort(n) => n.on_signal(signal, out),
            Node::Diff(n) => n.on_signal(signal, out),
            Node::Collector(n) => n.on_signal(signal, out),
            Node::Writer(n) => n.on_signal(signal, out),
        }
    }

    pub fn parallelism(&self) -> Parallelism {
        match self {
            Node::Source(_)
            | Node::Basic(_)
            | Node::InvalidDetection(_)
            | Node::Enforce(_)
            | Node::Diff(_) => Parallelism::Partitioned,
            Node::Action(n) if !n.action().behavior().forbids_distributed() => {
                Parallelism::Partitioned
            }
            Node::Statistics(n) if n.mode() == StatisticsMode::Streaming => {
                Parallelism::Partitioned
            }
            _ => Parallelism::Sequential,
        }
    }

    /// Fresh copy for one partition of the batch runtime.
    ///
    /// `None` for nodes that only run sequentially.
    pub fn partition_copy(&self) -> Option<Node> {
        if self.parallelism() == Parallelism::Sequential {
            return None;
        }
        Some(match self {
            Node::Source(n) => Node::Source(n.partition_copy()),
            Node::Basic(n) => Node::Basic(n.clone()),
            Node::Action(n) => Node::Action(n.partition_copy()),
            Node::Statistics(n) => Node::Statistics(n.partition_copy()),
            Node::InvalidDetection(n) => Node::InvalidDetection(n.partition_copy()),
            Node::Enforce(n) => Node::Enforce(n.partition_copy()),
            Node::Diff(n) => Node::Diff(n.partition_copy()),
            _ => return None,
        })
    }

    /// Merge the state of a partition copy back into this node.
    pub fn absorb(&mut self, other: Node) {
        match (self, other) {
            (Node::Source(a), Node::Source(b)) => a.absorb(b),
            (Node::Basic(_), Node::Basic(_)) => {}
            (Node::Action(a), Node::Action(b)) => a.absorb(b),
            (Node::Statistics(a), Node::Statistics(b)) => a.absorb(b),
            (Node::InvalidDetection(a), Node::InvalidDetection(b)) => a.absorb(b),
            (Node::Enforce(a), Node::Enforce(b)) => a.absorb(b),
            (Node::Diff(a), Node::Diff(b)) => a.absorb(b),
            (a, b) => warn!("Cannot absorb a {} copy into a {} node", b.kind(), a.kind()),
        }
    }

    /// One-line description for the graph dump.
    pub fn describe(&self) -> String {
        match self {
            Node::Action(n) => {
                let status = match n.status().skip_reason() {
                    Some(reason) => format!("skipped: {}", reason),
                    None => "compiled".to_string(),
                };
                format!(
                    "{} #{} [{}] {} ({})",
                    n.name(),
                    n.index(),
                    n.branch().name(),
                    n.action().behavior(),
                    status
                )
            }
            Node::Basic(n) => format!("Basic({})", n.label()),
            Node::Limit(n) => format!("Limit({})", n.limit()),
            Node::Sort(n) => format!(
                "Sort({} {})",
                n.spec().column,
                if n.spec().descending { "desc" } else { "asc" }
            ),
            Node::Source(n) => format!("Source({} columns)", n.metadata().len()),
            other => other.name().to_string(),
        }
    }
}

/// Lifecycle of a node within one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Receiving,
    Signaled(Signal),
    Closed(Signal),
}

impl NodeState {
    pub fn is_closed(&self) -> bool {
        matches!(self, NodeState::Closed(_))
    }
}

/// A node with its outgoing link and lifecycle state.
#[derive(Debug)]
pub struct NodeSlot {
    pub(crate) id: NodeId,
    pub(crate) node: Node,
    pub(crate) link: Option<Link>,
    pub(crate) state: NodeState,
}

impl NodeSlot {
    pub fn new(id: NodeId, node: Node) -> Self {
        Self {
            id,
            node,
            link: None,
            state: NodeState::Created,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    pub fn link(&self) -> Option<&Link> {
        self.link.as_ref()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Deliver one packet; the node's output is appended to `out`.
    ///
    /// A terminal signal is handed to the node, then forwarded.
    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        if let NodeState::Closed(closed_by) = self.state {
            match packet {
                Packet::Signal(signal) => warn!(
                    "Node {:?} ({}) already closed by {}, ignoring {}",
                    self.id,
                    self.node.name(),
                    closed_by,
                    signal
                ),
                _ => trace!("Node {:?} is closed, packet ignored", self.id),
            }
            return Ok(());
        }

        let result = match packet {
            Packet::Signal(signal) => {
                self.state = NodeState::Signaled(signal);
                let result = self.node.on_signal(signal, out);
                out.push(Packet::Signal(signal));
                self.state = NodeState::Closed(signal);
                result
            }
            packet => {
                self.state = NodeState::Receiving;
                self.node.receive(packet, out)
            }
        };
        result.map_err(|e| self.own_error(e))
    }

    /// Deliver packets in order; same as one-by-one delivery.
    pub fn receive_batch(
        &mut self,
        packets: impl IntoIterator<Item = Packet>,
        out: &mut Vec<Packet>,
    ) -> PipelineResult<()> {
        for packet in packets {
            self.receive(packet, out)?;
        }
        Ok(())
    }

    fn own_error(&self, error: PipelineError) -> PipelineError {
        attribute(self.id, error)
    }
}

/// Name `id` in a structural error raised without a node id
pub(crate) fn attribute(id: NodeId, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::Structural { node, message } if !node.is_valid() => {
            PipelineError::structural(id, message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Row, RowMetadata};
    use std::sync::Arc;

    fn source_slot() -> (NodeSlot, Arc<RowMetadata>) {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        (NodeSlot::new(NodeId(3), Node::Source(SourceNode::new(md.clone()))), md)
    }

    #[test]
    fn test_lifecycle() {
        let (mut slot, md) = source_slot();
        assert_eq!(slot.state(), NodeState::Created);

        let mut out = Vec::new();
        slot.receive(Packet::row(Row::new(1), md.clone()), &mut out).unwrap();
        assert_eq!(slot.state(), NodeState::Receiving);

        slot.receive(Packet::Signal(Signal::EndOfStream), &mut out).unwrap();
        assert_eq!(slot.state(), NodeState::Closed(Signal::EndOfStream));
        assert_eq!(out.len(), 2);

        // Ignored once closed
        slot.receive(Packet::row(Row::new(2), md), &mut out).unwrap();
        slot.receive(Packet::Signal(Signal::Cancel), &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_structural_error_names_the_slot() {
        let (mut slot, md) = source_slot();
        let row = Row::new(1).with("9999", "x");
        let err = slot.receive(Packet::row(row, md), &mut Vec::new()).unwrap_err();
        match err {
            PipelineError::Structural { node, .. } => assert_eq!(node, NodeId(3)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parallelism() {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        assert_eq!(
            Node::Source(SourceNode::new(md.clone())).parallelism(),
            Parallelism::Partitioned
        );
        assert_eq!(Node::Limit(LimitNode::new(3)).parallelism(), Parallelism::Sequential);
        assert!(Node::Collector(CollectorNode::new(md, false))
            .partition_copy()
            .is_none());
    }
}
