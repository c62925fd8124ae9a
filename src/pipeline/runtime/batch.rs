//! Partition-parallel runtime.
//!
//! The source is read up front and split into contiguous partitions.
//! Nodes then run one at a time, in topological order, over the whole
//! dataset:
//! - partition-safe nodes run one fresh copy per partition in parallel;
//!   the copies are absorbed back into the node in partition order and the
//!   node itself receives the single end-of-stream
//! - barrier nodes (limit, sort, blocking statistics, sinks, actions that
//!   forbid distribution) see the concatenated partitions in order
//!
//! The output is the same as the sequential runtime's.

use super::{check_closed, fail, report, CancelToken, Runtime};
use crate::config::{RuntimeKind, RuntimeSettings};
use crate::pipeline::compiled_plan::CompiledPlan;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::id::NodeId;
use crate::pipeline::link::Link;
use crate::pipeline::node::{attribute, Node};
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::report::{ExecutionFailure, ExecutionReport, Outcome};
use crate::pipeline::visit::partition_copies;
use crate::source::RowSource;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

type Partitions = Vec<Vec<Packet>>;

/// Split `packets` into at most `n` contiguous, non-empty partitions
fn split(packets: Vec<Packet>, n: usize) -> Partitions {
    let size = packets.len().div_ceil(n.max(1)).max(1);
    let mut parts = Vec::new();
    let mut packets = packets.into_iter();
    loop {
        let part: Vec<Packet> = packets.by_ref().take(size).collect();
        if part.is_empty() {
            break;
        }
        parts.push(part);
    }
    parts
}

#[derive(Debug, Clone, Default)]
pub struct BatchRuntime {
    settings: RuntimeSettings,
}

impl BatchRuntime {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self { settings }
    }

    fn thread_pool(&self) -> PipelineResult<Option<rayon::ThreadPool>> {
        self.settings
            .max_threads
            .map(|n| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| PipelineError::Runtime(format!("thread pool: {}", e)))
            })
            .transpose()
    }

    fn read_source(
        &self,
        pipeline: &Pipeline,
        source: &mut dyn RowSource,
        cancel: &CancelToken,
    ) -> PipelineResult<Vec<Packet>> {
        let schema = pipeline.schema().clone();
        let batch_size = self.settings.effective_batch_size();
        let mut rows = Vec::new();
        while let Some(row) = source.next_row() {
            if rows.len() % batch_size == 0 && cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            rows.push(Packet::row(row?, schema.clone()));
        }
        Ok(rows)
    }

    fn run(
        &self,
        pipeline: &mut Pipeline,
        plan: &CompiledPlan,
        source: &mut dyn RowSource,
        cancel: &CancelToken,
    ) -> PipelineResult<()> {
        let pool = self.thread_pool()?;
        let partitions = self.settings.effective_partitions();

        let rows = self.read_source(pipeline, source, cancel)?;
        debug!("Read {} rows into {} partitions", rows.len(), partitions);

        let mut inputs: Vec<Option<Partitions>> = vec![None; pipeline.len()];
        if let Some(slot) = inputs.get_mut(pipeline.source().index()) {
            *slot = Some(split(rows, partitions));
        }
        let mut zip_sides: Vec<[Option<Vec<Packet>>; 2]> = vec![[None, None]; pipeline.joins().len()];

        for &id in &plan.order {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let parts = inputs
                .get_mut(id.index())
                .and_then(Option::take)
                .unwrap_or_default();

            let output = match partition_copies(pipeline, id, parts.len()) {
                Some(copies) => self.run_partitioned(pipeline, id, copies, parts, pool.as_ref())?,
                None => self.run_whole(pipeline, id, parts)?,
            };
            self.route(pipeline, id, output, partitions, &mut inputs, &mut zip_sides)?;
        }

        check_closed(pipeline, plan)
    }

    /// One copy per partition in parallel, then absorb and end-of-stream
    fn run_partitioned(
        &self,
        pipeline: &mut Pipeline,
        id: NodeId,
        copies: Vec<Node>,
        parts: Partitions,
        pool: Option<&rayon::ThreadPool>,
    ) -> PipelineResult<Partitions> {
        let work = move || {
            copies
                .into_par_iter()
                .zip(parts.into_par_iter())
                .map(|(mut node, packets)| -> PipelineResult<(Node, Vec<Packet>)> {
                    let mut out = Vec::with_capacity(packets.len());
                    for packet in packets {
                        node.receive(packet, &mut out)
                            .map_err(|e| attribute(id, e))?;
                    }
                    Ok((node, out))
                })
                .collect::<PipelineResult<Vec<_>>>()
        };
        let results = match pool {
            Some(pool) => pool.install(work),
            None => work(),
        }?;

        let slot = pipeline
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| PipelineError::InvalidLink(format!("no node {:?}", id)))?;
        let mut output = Vec::with_capacity(results.len());
        for (copy, out) in results {
            slot.node.absorb(copy);
            output.push(out);
        }

        let mut tail = Vec::new();
        slot.receive(Packet::Signal(Signal::EndOfStream), &mut tail)?;
        tail.retain(|p| !p.is_signal());
        if !tail.is_empty() {
            match output.last_mut() {
                Some(last) => last.extend(tail),
                None => output.push(tail),
            }
        }
        Ok(output)
    }

    /// The whole dataset, in order, through the node itself
    fn run_whole(
        &self,
        pipeline: &mut Pipeline,
        id: NodeId,
        parts: Partitions,
    ) -> PipelineResult<Partitions> {
        let slot = pipeline
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| PipelineError::InvalidLink(format!("no node {:?}", id)))?;
        let mut out = Vec::new();
        slot.receive_batch(parts.into_iter().flatten(), &mut out)?;
        slot.receive(Packet::Signal(Signal::EndOfStream), &mut out)?;
        out.retain(|p| !p.is_signal());
        Ok(vec![out])
    }

    /// Hand the output of `from` to the inputs of its successors
    fn route(
        &self,
        pipeline: &mut Pipeline,
        from: NodeId,
        output: Partitions,
        partitions: usize,
        inputs: &mut [Option<Partitions>],
        zip_sides: &mut [[Option<Vec<Packet>>; 2]],
    ) -> PipelineResult<()> {
        let link = pipeline
            .nodes()
            .get(from.index())
            .and_then(|slot| slot.link().cloned());

        let mut store = |to: NodeId, parts: Partitions| match inputs.get_mut(to.index()) {
            Some(slot) => {
                slot.get_or_insert_with(Vec::new).extend(parts);
                Ok(())
            }
            None => Err(PipelineError::InvalidLink(format!("no node {:?}", to))),
        };

        match link {
            None => Ok(()),
            Some(Link::Basic(to)) => store(to, output),
            Some(Link::Clone(targets)) => {
                if let Some((last, rest)) = targets.split_last() {
                    for to in rest {
                        store(*to, output.clone())?;
                    }
                    store(*last, output)?;
                }
                Ok(())
            }
            Some(Link::Zip { join, side }) => {
                let sides = zip_sides
                    .get_mut(join.index())
                    .ok_or_else(|| PipelineError::InvalidLink(format!("no join {:?}", join)))?;
                sides[side.min(1)] = Some(output.into_iter().flatten().collect());
                if let [Some(_), Some(_)] = sides {
                    let [reference, preview] = std::mem::take(sides);
                    let zip = pipeline
                        .joins
                        .get_mut(join.index())
                        .ok_or_else(|| PipelineError::InvalidLink(format!("no join {:?}", join)))?;
                    let mut zipped = Vec::new();
                    for packet in reference.unwrap_or_default() {
                        zipped.extend(zip.push(0, packet));
                    }
                    for packet in preview.unwrap_or_default() {
                        zipped.extend(zip.push(1, packet));
                    }
                    zipped.extend(zip.push(0, Packet::Signal(Signal::EndOfStream)));
                    zipped.extend(zip.push(1, Packet::Signal(Signal::EndOfStream)));
                    zipped.retain(|p| !p.is_signal());
                    let target = zip.target();
                    store(target, split(zipped, partitions))?;
                }
                Ok(())
            }
        }
    }
}

impl Runtime for BatchRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Batch
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

        match self.run(pipeline, &plan, source, cancel) {
            Ok(()) => {
                let report = report(pipeline, kind, Outcome::Completed, started);
                info!(
                    "Batch execution completed: {} rows in {} partitions, {} ms",
                    report.rows_read,
                    self.settings.effective_partitions(),
                    report.elapsed.as_millis()
                );
                Ok(report)
            }
            Err(e) => Err(fail(pipeline, Some(&plan), kind, e, started)),
        }
    }
}
