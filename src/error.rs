//! Error handling for dataprep-rs
//!
//! This module defines the crate-level error type and a Result alias used
//! at the outer surfaces (configuration, CLI plumbing). Pipeline and action
//! errors have their own types, see [`PipelineError`] and
//! [`ActionError`](crate::action::ActionError).

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for dataprep-rs operations
#[derive(Error, Debug)]
pub enum PrepError {
    /// Errors raised while building or executing a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

/// Result type alias for dataprep-rs operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PrepError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
