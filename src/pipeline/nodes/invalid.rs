//! InvalidDetectionNode: flags cells not valid for their column type.

use crate::analysis::is_valid;
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;

/// Sets the invalid flag of every non-empty cell rejected by its column
/// type and clears it everywhere else. Values are never touched.
#[derive(Debug, Clone, Default)]
pub struct InvalidDetectionNode {
    flagged: u64,
}

impl InvalidDetectionNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        "InvalidDetection"
    }

    /// Cells flagged invalid so far
    pub fn flagged(&self) -> u64 {
        self.flagged
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(mut p) => {
                for column in p.metadata.columns() {
                    let invalid = match p.row.get(&column.id) {
                        Some(value) if !value.trim().is_empty() => {
                            !is_valid(value, column.data_type)
                        }
                        _ => false,
                    };
                    if invalid {
                        self.flagged += 1;
                    }
                    p.row.set_invalid(&column.id, invalid);
                }
                out.push(Packet::Row(p));
            }
            other => out.push(other),
        }
        Ok(())
    }

    pub fn on_signal(&mut self, _signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        Ok(())
    }

    pub fn partition_copy(&self) -> Self {
        Self::new()
    }

    pub fn absorb(&mut self, other: InvalidDetectionNode) {
        self.flagged += other.flagged;
    }
}
