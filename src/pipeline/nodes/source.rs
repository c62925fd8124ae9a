//! SourceNode: entry point of the graph.

use super::check_row_columns;
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;
use crate::types::RowMetadata;
use std::sync::Arc;

/// Receives the rows pulled by the runtime and checks them against the
/// source schema.
#[derive(Debug, Clone)]
pub struct SourceNode {
    metadata: Arc<RowMetadata>,
    rows: u64,
}

impl SourceNode {
    pub fn new(metadata: Arc<RowMetadata>) -> Self {
        Self { metadata, rows: 0 }
    }

    pub fn name(&self) -> &str {
        "Source"
    }

    pub fn metadata(&self) -> &Arc<RowMetadata> {
        &self.metadata
    }

    /// Rows received so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        if let Packet::Row(p) = &packet {
            check_row_columns(&p.row, &p.metadata)?;
            self.rows += 1;
        }
        out.push(packet);
        Ok(())
    }

    pub fn on_signal(&mut self, signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        tracing::debug!("Source received {} after {} rows", signal, self.rows);
        Ok(())
    }

    pub fn partition_copy(&self) -> Self {
        Self::new(self.metadata.clone())
    }

    pub fn absorb(&mut self, other: SourceNode) {
        self.rows += other.rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;
    use crate::types::Row;

    #[test]
    fn test_rejects_unknown_columns() {
        let metadata = Arc::new(RowMetadata::from_names(&["a"]));
        let mut node = SourceNode::new(metadata.clone());
        let mut out = Vec::new();

        node.receive(Packet::row(Row::new(1).with("0000", "x"), metadata.clone()), &mut out)
            .unwrap();
        let err = node
            .receive(Packet::row(Row::new(2).with("0009", "x"), metadata), &mut out)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Structural { .. }));
        assert_eq!(node.rows(), 1);
        assert_eq!(out.len(), 1);
    }
}
