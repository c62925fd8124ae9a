//! CollectorNode: in-memory sink.

use super::check_row_columns;
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;
use crate::types::{Row, RowMetadata};
use std::sync::Arc;

/// Collects output rows and the final metadata.
///
/// Deleted rows are dropped unless `keep_deleted` is set. The final
/// metadata is the last one seen, either with a row or as a `Metadata`
/// packet; the compiled schema is used when neither arrived.
#[derive(Debug, Clone)]
pub struct CollectorNode {
    rows: Vec<Row>,
    metadata: Option<Arc<RowMetadata>>,
    fallback: Arc<RowMetadata>,
    keep_deleted: bool,
    finished: Option<Signal>,
}

impl CollectorNode {
    pub fn new(fallback: Arc<RowMetadata>, keep_deleted: bool) -> Self {
        Self {
            rows: Vec::new(),
            metadata: None,
            fallback,
            keep_deleted,
            finished: None,
        }
    }

    pub fn name(&self) -> &str {
        "Collector"
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn metadata(&self) -> &Arc<RowMetadata> {
        self.metadata.as_ref().unwrap_or(&self.fallback)
    }

    /// Signal the collector closed with, if any
    pub fn finished(&self) -> Option<Signal> {
        self.finished
    }

    /// Empty collector with the same settings
    pub fn fresh_copy(&self) -> Self {
        Self::new(self.fallback.clone(), self.keep_deleted)
    }

    /// Move the collected rows and final metadata out
    pub fn take(&mut self) -> (Vec<Row>, Arc<RowMetadata>) {
        let metadata = self.metadata().clone();
        (std::mem::take(&mut self.rows), metadata)
    }

    pub fn receive(&mut self, packet: Packet, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => {
                check_row_columns(&p.row, &p.metadata)?;
                self.metadata = Some(p.metadata);
                if self.keep_deleted || !p.row.is_deleted() {
                    self.rows.push(p.row);
                }
            }
            Packet::Metadata(metadata) => self.metadata = Some(metadata),
            Packet::Zipped(pair) => {
                tracing::warn!("Collector ignores a zipped packet of {} rows", pair.len());
            }
            Packet::Signal(_) => {}
        }
        Ok(())
    }

    pub fn on_signal(&mut self, signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        if !signal.flushes() {
            self.rows.clear();
        }
        self.finished = Some(signal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_deleted_rows_unless_kept() {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let mut deleted = Row::new(2);
        deleted.set_deleted(true);

        for (keep, expected) in [(false, 1), (true, 2)] {
            let mut node = CollectorNode::new(md.clone(), keep);
            let mut out = Vec::new();
            node.receive(Packet::row(Row::new(1), md.clone()), &mut out).unwrap();
            node.receive(Packet::row(deleted.clone(), md.clone()), &mut out).unwrap();
            node.on_signal(Signal::EndOfStream, &mut out).unwrap();
            assert_eq!(node.take().0.len(), expected);
        }
    }

    #[test]
    fn test_metadata_packet_wins() {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let updated = Arc::new(RowMetadata::from_names(&["a", "b"]));
        let mut node = CollectorNode::new(md.clone(), false);
        let mut out = Vec::new();
        node.receive(Packet::row(Row::new(1), md), &mut out).unwrap();
        node.receive(Packet::Metadata(updated.clone()), &mut out).unwrap();
        assert!(Arc::ptr_eq(node.metadata(), &updated));
    }

    #[test]
    fn test_cancel_clears_rows() {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let mut node = CollectorNode::new(md.clone(), false);
        let mut out = Vec::new();
        node.receive(Packet::row(Row::new(1), md), &mut out).unwrap();
        node.on_signal(Signal::Cancel, &mut out).unwrap();
        assert!(node.rows().is_empty());
        assert_eq!(node.finished(), Some(Signal::Cancel));
    }
}
