//! EnforceNode: aligns row cells with the metadata they travel with.

use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;

/// Inserts empty cells for columns the row lacks and removes cells (and
/// their invalid flags) of columns the metadata no longer has.
#[derive(Debug, Clone, Default)]
pub struct EnforceNode {
    added: u64,
    removed: u64,
}

impl EnforceNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        "Enforce"
    }

    /// Cells added and removed so far
    pub fn changes(&self) -> (u64, u64) {
        (self.added, self.removed)
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(mut p) => {
                let orphans: Vec<String> = p
                    .row
                    .orphan_columns(&p.metadata)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                for id in orphans {
                    p.row.remove(&id);
                    self.removed += 1;
                }
                for id in p.metadata.ids() {
                    if !p.row.contains(id) {
                        p.row.set(id, "");
                        self.added += 1;
                    }
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

    pub fn absorb(&mut self, other: EnforceNode) {
        self.added += other.added;
        self.removed += other.removed;
    }
}
