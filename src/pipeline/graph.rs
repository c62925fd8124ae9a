//! The pipeline graph: node slots, zip joins and depth-first delivery.
//!
//! A `Pipeline` is built once (see [`crate::pipeline::builder`]) and
//! executed once by a runtime. Use [`crate::pipeline::visit::shallow_copy`]
//! to get a fresh graph for another run.

use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::{JoinId, NodeId};
use crate::pipeline::link::{Link, ZipJoin};
use crate::pipeline::node::{Node, NodeSlot};
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::report::ActionReport;
use crate::types::{Row, RowMetadata};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Pipeline {
    pub(crate) nodes: Vec<NodeSlot>,
    pub(crate) joins: Vec<ZipJoin>,
    source: NodeId,
    schema: Arc<RowMetadata>,
    plan: Option<CompiledPlan>,
    executed: bool,
}

impl Pipeline {
    /// Empty graph for rows of `schema`
    pub fn new(schema: Arc<RowMetadata>) -> Self {
        Self {
            nodes: Vec::new(),
            joins: Vec::new(),
            source: NodeId::INVALID,
            schema,
            plan: None,
            executed: false,
        }
    }

    // ── Graph building ──

    /// Add a node to the pipeline. Returns its NodeId.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot::new(id, node));
        id
    }

    /// Mark the node the runtime feeds rows into
    pub fn set_source(&mut self, id: NodeId) -> PipelineResult<()> {
        self.slot(id)?;
        self.source = id;
        Ok(())
    }

    fn set_link(&mut self, from: NodeId, link: Link) -> PipelineResult<()> {
        let slot = self.slot_mut(from)?;
        if slot.link.is_some() {
            return Err(PipelineError::InvalidLink(format!(
                "node {:?} already has an outgoing link",
                from
            )));
        }
        slot.link = Some(link);
        Ok(())
    }

    /// Basic link `from → to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> PipelineResult<()> {
        self.slot(to)?;
        self.set_link(from, Link::Basic(to))
    }

    /// Clone link `from → targets`
    pub fn clone_to(&mut self, from: NodeId, targets: Vec<NodeId>) -> PipelineResult<()> {
        if targets.is_empty() {
            return Err(PipelineError::InvalidLink(format!(
                "clone link from {:?} has no targets",
                from
            )));
        }
        for to in &targets {
            self.slot(*to)?;
        }
        self.set_link(from, Link::Clone(targets))
    }

    /// Zip `reference` (side 0) and `preview` (side 1) into `target`
    pub fn zip(
        &mut self,
        reference: NodeId,
        preview: NodeId,
        target: NodeId,
    ) -> PipelineResult<JoinId> {
        self.slot(target)?;
        let join = JoinId(self.joins.len() as u32);
        self.set_link(reference, Link::Zip { join, side: 0 })?;
        self.set_link(preview, Link::Zip { join, side: 1 })?;
        self.joins.push(ZipJoin::new(target));
        Ok(join)
    }

    // ── Accessors ──

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn schema(&self) -> &Arc<RowMetadata> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeSlot] {
        &self.nodes
    }

    pub fn joins(&self) -> &[ZipJoin] {
        &self.joins
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).map(|slot| &slot.node)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Plan compiled by the last [`Pipeline::begin`]
    pub fn plan(&self) -> Option<&CompiledPlan> {
        self.plan.as_ref()
    }

    fn slot(&self, id: NodeId) -> PipelineResult<&NodeSlot> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| PipelineError::InvalidLink(format!("no node {:?}", id)))
    }

    fn slot_mut(&mut self, id: NodeId) -> PipelineResult<&mut NodeSlot> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| PipelineError::InvalidLink(format!("no node {:?}", id)))
    }

    // ── Execution ──

    /// Claim the graph for one execution and compile its plan.
    pub fn begin(&mut self) -> PipelineResult<CompiledPlan> {
        if self.executed {
            return Err(PipelineError::AlreadyExecuted);
        }
        self.executed = true;
        let plan = PipelineCompiler::compile(&self.nodes, &self.joins, self.source)?;
        info!(
            "Pipeline compiled: {} of {} nodes active in {}us",
            plan.stats.active_nodes, plan.stats.total_nodes, plan.stats.compile_time_us
        );
        self.plan = Some(plan.clone());
        Ok(plan)
    }

    /// Deliver a packet to `id` and everything downstream of it, depth first.
    pub fn deliver(&mut self, id: NodeId, packet: Packet) -> PipelineResult<()> {
        let mut out = Vec::new();
        self.slot_mut(id)?.receive(packet, &mut out)?;
        self.route(id, out)
    }

    /// Deliver packets in order
    pub fn deliver_all(
        &mut self,
        id: NodeId,
        packets: impl IntoIterator<Item = Packet>,
    ) -> PipelineResult<()> {
        for packet in packets {
            self.deliver(id, packet)?;
        }
        Ok(())
    }

    /// Route the output of `from` along its link
    pub(crate) fn route(&mut self, from: NodeId, packets: Vec<Packet>) -> PipelineResult<()> {
        if packets.is_empty() {
            return Ok(());
        }
        let link = match &self.slot(from)?.link {
            Some(link) => link.clone(),
            None => return Ok(()),
        };
        match link {
            Link::Basic(to) => self.deliver_all(to, packets),
            Link::Clone(targets) => {
                for packet in packets {
                    if let Some((last, rest)) = targets.split_last() {
                        for to in rest {
                            self.deliver(*to, packet.clone())?;
                        }
                        self.deliver(*last, packet)?;
                    }
                }
                Ok(())
            }
            Link::Zip { join, side } => {
                for packet in packets {
                    let zip = self.joins.get_mut(join.index()).ok_or_else(|| {
                        PipelineError::InvalidLink(format!("no join {:?}", join))
                    })?;
                    let target = zip.target();
                    let forwarded = zip.push(side, packet);
                    self.deliver_all(target, forwarded)?;
                }
                Ok(())
            }
        }
    }

    /// Send `signal` to every planned node that is still open.
    ///
    /// Each node is signalled on its own, in plan order; what it emits is
    /// dropped. Errors are logged, the rest of the nodes still close.
    pub fn close_open(&mut self, plan: &CompiledPlan, signal: Signal) {
        for &id in &plan.order {
            let Some(slot) = self.nodes.get_mut(id.index()) else {
                continue;
            };
            if slot.state.is_closed() {
                continue;
            }
            let mut out = Vec::new();
            if let Err(e) = slot.receive(Packet::Signal(signal), &mut out) {
                warn!("Node {:?} failed to close on {}: {}", id, signal, e);
            }
        }
        for join in &mut self.joins {
            if join.forwarded().is_none() {
                join.push(0, Packet::Signal(signal));
            }
        }
        debug!("Closed open nodes with {}", signal);
    }

    /// Planned nodes that have not received a terminal signal
    pub fn open_nodes(&self, plan: &CompiledPlan) -> Vec<NodeId> {
        plan.order
            .iter()
            .copied()
            .filter(|id| {
                self.nodes
                    .get(id.index())
                    .is_some_and(|slot| !slot.state.is_closed())
            })
            .collect()
    }

    /// Whether the limit right after the source lets nothing more through
    pub fn source_saturated(&self) -> bool {
        let Some(Link::Basic(next)) = self.nodes.get(self.source.index()).and_then(|s| s.link.as_ref())
        else {
            return false;
        };
        matches!(self.node(*next), Some(Node::Limit(limit)) if limit.is_saturated())
    }

    /// Reports of every action node, in build order
    pub fn action_reports(&self) -> Vec<ActionReport> {
        self.nodes
            .iter()
            .filter_map(|slot| match &slot.node {
                Node::Action(action) => Some(action.report()),
                _ => None,
            })
            .collect()
    }

    /// Rows read by the source node
    pub fn rows_read(&self) -> u64 {
        match self.node(self.source) {
            Some(Node::Source(source)) => source.rows(),
            _ => 0,
        }
    }

    /// Rows and final metadata of the first collector sink
    pub fn take_collected(&mut self) -> Option<(Vec<Row>, Arc<RowMetadata>)> {
        self.nodes.iter_mut().find_map(|slot| match &mut slot.node {
            Node::Collector(collector) => Some(collector.take()),
            _ => None,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("nodes", &self.nodes.len())
            .field("joins", &self.joins.len())
            .field("source", &self.source)
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::nodes::{BasicNode, CollectorNode, LimitNode, SourceNode};

    fn schema() -> Arc<RowMetadata> {
        Arc::new(RowMetadata::from_names(&["a"]))
    }

    fn clone_graph() -> (Pipeline, NodeId, NodeId) {
        let md = schema();
        let mut p = Pipeline::new(md.clone());
        let source = p.add_node(Node::Source(SourceNode::new(md.clone())));
        let left = p.add_node(Node::Collector(CollectorNode::new(md.clone(), false)));
        let right = p.add_node(Node::Collector(CollectorNode::new(md, false)));
        p.set_source(source).unwrap();
        p.clone_to(source, vec![left, right]).unwrap();
        (p, left, right)
    }

    #[test]
    fn test_clone_link_delivers_to_every_branch() {
        let (mut p, left, right) = clone_graph();
        let plan = p.begin().unwrap();
        let md = p.schema().clone();
        p.deliver(p.source(), Packet::row(Row::new(1).with("0000", "x"), md))
            .unwrap();
        p.deliver(p.source(), Packet::Signal(Signal::EndOfStream)).unwrap();

        assert!(p.open_nodes(&plan).is_empty());
        for id in [left, right] {
            match p.node(id) {
                Some(Node::Collector(c)) => assert_eq!(c.rows().len(), 1),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_executes_once() {
        let (mut p, _, _) = clone_graph();
        p.begin().unwrap();
        assert!(matches!(p.begin(), Err(PipelineError::AlreadyExecuted)));
    }

    #[test]
    fn test_second_link_is_rejected() {
        let md = schema();
        let mut p = Pipeline::new(md.clone());
        let a = p.add_node(Node::Basic(BasicNode::new("a")));
        let b = p.add_node(Node::Basic(BasicNode::new("b")));
        p.connect(a, b).unwrap();
        assert!(matches!(p.connect(a, b), Err(PipelineError::InvalidLink(_))));
        assert!(matches!(
            p.connect(a, NodeId(42)),
            Err(PipelineError::InvalidLink(_))
        ));
    }

    #[test]
    fn test_close_open_signals_remaining_nodes() {
        let (mut p, _, _) = clone_graph();
        let plan = p.begin().unwrap();
        p.close_open(&plan, Signal::Cancel);
        assert!(p.open_nodes(&plan).is_empty());
    }

    #[test]
    fn test_source_saturated() {
        let md = schema();
        let mut p = Pipeline::new(md.clone());
        let source = p.add_node(Node::Source(SourceNode::new(md.clone())));
        let limit = p.add_node(Node::Limit(LimitNode::new(1)));
        let sink = p.add_node(Node::Collector(CollectorNode::new(md.clone(), false)));
        p.set_source(source).unwrap();
        p.connect(source, limit).unwrap();
        p.connect(limit, sink).unwrap();
        p.begin().unwrap();

        assert!(!p.source_saturated());
        p.deliver(source, Packet::row(Row::new(1), md)).unwrap();
        assert!(p.source_saturated());
    }
}
