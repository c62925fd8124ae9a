//! Pipeline-specific error types.

use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Errors that can occur while building or executing a pipeline.
///
/// Action compile and row failures are not pipeline errors; they are
/// contained by the action node and reported through its counters.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Node {node:?} error: {message}")]
    Structural { node: NodeId, message: String },

    #[error("IO error: {0}")]
    Resource(#[from] std::io::Error),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Cycle detected in pipeline graph")]
    CycleDetected,

    #[error("Node {0:?} cannot be copied")]
    NotCopyable(NodeId),

    #[error("Pipeline was already executed")]
    AlreadyExecuted,

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Channel receive error")]
    ChannelRecv,
}

impl PipelineError {
    pub fn structural(node: NodeId, message: impl Into<String>) -> Self {
        PipelineError::Structural {
            node,
            message: message.into(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
