//! Built-in pipeline node implementations.

pub mod action;
pub mod basic;
pub mod collector;
pub mod diff;
pub mod enforce;
pub mod invalid;
pub mod limit;
pub mod sort;
pub mod source;
pub mod statistics;
pub mod writer;

pub use action::{ActionCounters, ActionNode};
pub use basic::BasicNode;
pub use collector::CollectorNode;
pub use diff::{DiffCounters, DiffNode};
pub use enforce::EnforceNode;
pub use invalid::InvalidDetectionNode;
pub use limit::LimitNode;
pub use sort::{SortNode, SortSpec};
pub use source::SourceNode;
pub use statistics::{StatisticsMode, StatisticsNode};
pub use writer::WriterNode;

use crate::pipeline::error::PipelineError;
use crate::pipeline::id::NodeId;
use crate::types::Row;

/// Rejects non-deleted rows holding cells for columns outside `metadata`.
///
/// The error carries an invalid node id; the node slot fills in its own.
pub(crate) fn check_row_columns(
    row: &Row,
    metadata: &crate::types::RowMetadata,
) -> Result<(), PipelineError> {
    if row.is_deleted() {
        return Ok(());
    }
    let orphans = row.orphan_columns(metadata);
    if orphans.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::structural(
            NodeId::INVALID,
            format!("row {} has cells for unknown columns {:?}", row.id, orphans),
        ))
    }
}
