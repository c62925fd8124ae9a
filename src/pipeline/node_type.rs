//! Node kind enumeration.
//!
//! This module names the kinds of nodes a pipeline is built from, for
//! dumps, logs and the CLI.

use serde::{Deserialize, Serialize};

/// Kinds of pipeline nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Boundary nodes
    /// Entry point of the rows pulled from the row source.
    Source,
    /// In-memory sink collecting the output rows.
    Collector,
    /// Sink streaming rows to a row writer.
    Writer,

    // Transform nodes
    /// Pass-through node heading a branch.
    Basic,
    /// Runs one compiled action.
    Action,
    /// Computes quality and statistics.
    Statistics,
    /// Flags invalid cells.
    InvalidDetection,
    /// Aligns row cells with the metadata.
    Enforce,
    /// Keeps the first N rows.
    Limit,
    /// Sorts rows on a column.
    Sort,
    /// Annotates differences between two zipped rows.
    Diff,
}

impl NodeKind {
    /// Get the display name for this node kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Collector => "Collector",
            NodeKind::Writer => "Writer",
            NodeKind::Basic => "Basic",
            NodeKind::Action => "Action",
            NodeKind::Statistics => "Statistics",
            NodeKind::InvalidDetection => "Invalid Detection",
            NodeKind::Enforce => "Metadata Enforcement",
            NodeKind::Limit => "Limit",
            NodeKind::Sort => "Sort",
            NodeKind::Diff => "Diff",
        }
    }

    /// Get all node kinds.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Source,
            NodeKind::Collector,
            NodeKind::Writer,
            NodeKind::Basic,
            NodeKind::Action,
            NodeKind::Statistics,
            NodeKind::InvalidDetection,
            NodeKind::Enforce,
            NodeKind::Limit,
            NodeKind::Sort,
            NodeKind::Diff,
        ]
    }

    /// Check if this node kind is a sink (has no outgoing link).
    pub fn is_sink(&self) -> bool {
        matches!(self, NodeKind::Collector | NodeKind::Writer)
    }

    /// Check if this node kind holds rows back until end-of-stream.
    pub fn buffers(&self) -> bool {
        matches!(self, NodeKind::Sort | NodeKind::Collector)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Source =>
                "Receives rows from the row source.\n\
                 Checks every row against the source schema.",

            NodeKind::Collector =>
                "Collects output rows in memory.\n\
                 Keeps the final metadata of the run.",

            NodeKind::Writer =>
                "Streams output rows to a row writer.\n\
                 Stores the final metadata in the cache.",

            NodeKind::Basic => "Forwards every packet unchanged.",

            NodeKind::Action =>
                "Applies one compiled action to eligible rows.\n\
                 Failing rows pass through unchanged.",

            NodeKind::Statistics =>
                "Counts valid, invalid and empty values.\n\
                 Streaming mode emits metadata at the end,\n\
                 blocking mode releases rows with it.",

            NodeKind::InvalidDetection =>
                "Flags cells that are not valid for\n\
                 the type of their column.",

            NodeKind::Enforce =>
                "Adds missing cells and removes cells\n\
                 of columns not in the metadata.",

            NodeKind::Limit => "Keeps the first N non-deleted rows.",

            NodeKind::Sort =>
                "Stable sort on a column.\n\
                 Numbers sort before text.",

            NodeKind::Diff =>
                "Compares reference and preview rows.\n\
                 Flags new, updated and deleted values.",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
