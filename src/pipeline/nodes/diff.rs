//! DiffNode: compares reference and preview rows.
//!
//! Fed by a zip join whose side 0 is the reference branch and side 1 the
//! preview branch. For every pair the preview row is emitted with a diff
//! annotation:
//! - row flag `new` when the reference row is deleted and the preview is not
//! - row flag `delete` when the preview row is deleted and the reference is
//!   not; the row is kept visible so the deletion can be shown
//! - otherwise cell flags: `new` for columns only the preview has, `delete`
//!   for columns only the reference has, `update` for changed values

use crate::pipeline::packet::{Packet, RowPacket, Signal};
use crate::pipeline::PipelineResult;
use crate::types::{DiffFlag, RowDiff};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffCounters {
    pub new_rows: u64,
    pub deleted_rows: u64,
    pub updated_cells: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DiffNode {
    counters: DiffCounters,
}

impl DiffNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        "Diff"
    }

    pub fn counters(&self) -> DiffCounters {
        self.counters
    }

    fn annotate(&mut self, reference: RowPacket, preview: RowPacket) -> RowPacket {
        let RowPacket { mut row, metadata } = preview;
        let mut diff = RowDiff::default();

        match (reference.row.is_deleted(), row.is_deleted()) {
            (true, true) => {}
            (true, false) => {
                diff.row = Some(DiffFlag::New);
                self.counters.new_rows += 1;
            }
            (false, true) => {
                diff.row = Some(DiffFlag::Delete);
                row.set_deleted(false);
                self.counters.deleted_rows += 1;
            }
            (false, false) => {
                for column in metadata.columns() {
                    if !reference.metadata.contains(&column.id) {
                        diff.cells.insert(column.id.clone(), DiffFlag::New);
                    } else if reference.row.get(&column.id).unwrap_or("")
                        != row.get(&column.id).unwrap_or("")
                    {
                        diff.cells.insert(column.id.clone(), DiffFlag::Update);
                        self.counters.updated_cells += 1;
                    }
                }
                for column in reference.metadata.columns() {
                    if !metadata.contains(&column.id) {
                        diff.cells.insert(column.id.clone(), DiffFlag::Delete);
                    }
                }
            }
        }

        row.set_diff(Some(diff));
        RowPacket::new(row, metadata)
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Zipped(pair) => {
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(reference), Some(preview)) => {
                        if reference.row.id != preview.row.id {
                            warn!(
                                "Diff pairs row {} with row {}; branches are out of step",
                                reference.row.id, preview.row.id
                            );
                        }
                        out.push(Packet::Row(self.annotate(reference, preview)));
                    }
                    (Some(single), None) => out.push(Packet::Row(single)),
                    _ => {}
                }
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

    pub fn absorb(&mut self, other: DiffNode) {
        self.counters.new_rows += other.counters.new_rows;
        self.counters.deleted_rows += other.counters.deleted_rows;
        self.counters.updated_cells += other.counters.updated_cells;
    }
}
