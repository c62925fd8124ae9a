//! StatisticsNode: quality counters and value statistics.
//!
//! Two modes:
//! - **Streaming**: rows pass through immediately; at end-of-stream the node
//!   emits a `Metadata` packet carrying the final quality and statistics.
//! - **Blocking**: rows are held back; at end-of-stream they are released
//!   with metadata carrying the statistics of the whole dataset. Used in
//!   front of actions that need dataset statistics.
//!
//! Stop and cancel discard buffered rows without emitting anything.

use crate::analysis::StatisticsAccumulator;
use crate::config::StatisticsSettings;
use crate::pipeline::packet::{Packet, RowPacket, Signal};
use crate::pipeline::PipelineResult;
use crate::types::RowMetadata;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsMode {
    Streaming,
    Blocking,
}

#[derive(Debug, Clone)]
pub struct StatisticsNode {
    mode: StatisticsMode,
    accumulator: StatisticsAccumulator,
    buffer: Vec<RowPacket>,
    last_metadata: Option<Arc<RowMetadata>>,
    /// Compiled schema, used when no row arrives
    fallback: Arc<RowMetadata>,
}

impl StatisticsNode {
    pub fn new(mode: StatisticsMode, settings: StatisticsSettings, fallback: Arc<RowMetadata>) -> Self {
        Self {
            mode,
            accumulator: StatisticsAccumulator::new(settings),
            buffer: Vec::new(),
            last_metadata: None,
            fallback,
        }
    }

    pub fn name(&self) -> &str {
        match self.mode {
            StatisticsMode::Streaming => "Statistics",
            StatisticsMode::Blocking => "Statistics(blocking)",
        }
    }

    pub fn mode(&self) -> StatisticsMode {
        self.mode
    }

    pub fn accumulator(&self) -> &StatisticsAccumulator {
        &self.accumulator
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => {
                self.accumulator.accept(&p.row, &p.metadata);
                self.last_metadata = Some(p.metadata.clone());
                match self.mode {
                    StatisticsMode::Streaming => out.push(Packet::Row(p)),
                    StatisticsMode::Blocking => self.buffer.push(p),
                }
            }
            Packet::Metadata(metadata) => self.last_metadata = Some(metadata),
            other => out.push(other),
        }
        Ok(())
    }

    fn with_statistics(&self, metadata: &RowMetadata) -> Arc<RowMetadata> {
        let mut metadata = metadata.clone();
        self.accumulator.apply_to(&mut metadata);
        Arc::new(metadata)
    }

    pub fn on_signal(&mut self, signal: Signal, out: &mut Vec<Packet>) -> PipelineResult<()> {
        if !signal.flushes() {
            self.buffer.clear();
            return Ok(());
        }

        let last = self
            .last_metadata
            .clone()
            .unwrap_or_else(|| self.fallback.clone());
        let updated = self.with_statistics(&last);

        match self.mode {
            StatisticsMode::Streaming => out.push(Packet::Metadata(updated)),
            StatisticsMode::Blocking => {
                let mut derived: Vec<(Arc<RowMetadata>, Arc<RowMetadata>)> =
                    vec![(last, updated)];
                for p in std::mem::take(&mut self.buffer) {
                    let metadata = match derived.iter().find(|(i, _)| Arc::ptr_eq(i, &p.metadata)) {
                        Some((_, o)) => o.clone(),
                        None => {
                            let o = self.with_statistics(&p.metadata);
                            derived.push((p.metadata.clone(), o.clone()));
                            o
                        }
                    };
                    out.push(Packet::row(p.row, metadata));
                }
            }
        }
        Ok(())
    }

    /// Fresh copy accumulating on its own; only streaming nodes are split
    pub fn partition_copy(&self) -> Self {
        Self {
            mode: self.mode,
            accumulator: self.accumulator.empty_like(),
            buffer: Vec::new(),
            last_metadata: None,
            fallback: self.fallback.clone(),
        }
    }

    pub fn absorb(&mut self, other: StatisticsNode) {
        self.accumulator.merge(&other.accumulator);
        if other.last_metadata.is_some() {
            self.last_metadata = other.last_metadata;
        }
        self.buffer.extend(other.buffer);
    }
}
