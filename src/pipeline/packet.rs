//! Packets travelling through the pipeline graph.
//!
//! Rows travel with the metadata they conform to. Metadata is shared as
//! `Arc<RowMetadata>` and never mutated in place; a node that changes the
//! schema emits a fresh `Arc`, so branches never observe each other's
//! schema edits.

use crate::types::{Row, RowMetadata};
use std::sync::Arc;

/// A row and the schema it conforms to.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPacket {
    pub row: Row,
    pub metadata: Arc<RowMetadata>,
}

impl RowPacket {
    pub fn new(row: Row, metadata: Arc<RowMetadata>) -> Self {
        Self { row, metadata }
    }
}

/// Terminal signals. Every node reachable from the source receives exactly
/// one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// All rows were delivered; flush buffered state
    EndOfStream,
    /// Stop early; discard buffered state
    Stop,
    /// Execution cancelled or failed; discard buffered state
    Cancel,
}

impl Signal {
    /// Whether buffered state is flushed downstream (as opposed to discarded)
    pub fn flushes(self) -> bool {
        matches!(self, Signal::EndOfStream)
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::EndOfStream => "end-of-stream",
            Signal::Stop => "stop",
            Signal::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unit of delivery between nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Row(RowPacket),
    /// Position-aligned rows from a zip join, one per side
    Zipped(Vec<RowPacket>),
    /// Final schema update, sent just before end-of-stream
    Metadata(Arc<RowMetadata>),
    Signal(Signal),
}

impl Packet {
    pub fn row(row: Row, metadata: Arc<RowMetadata>) -> Self {
        Packet::Row(RowPacket::new(row, metadata))
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, Packet::Signal(_))
    }

    pub fn as_row(&self) -> Option<&RowPacket> {
        match self {
            Packet::Row(p) => Some(p),
            _ => None,
        }
    }
}
