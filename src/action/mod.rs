//! Action contract
//!
//! An action is an immutable, named transformation. It declares what it
//! does through a [`BehaviorSet`], the scopes it supports, and implements a
//! two-phase protocol:
//!
//! 1. **compile**: called once per pipeline build with an [`ActionContext`]
//!    holding the parameters and the schema at that point. The action may
//!    edit the schema through the context and cache state in it.
//! 2. **apply**: called per eligible row with the compiled context.
//!
//! Actions that declare dataset-wide needs also get
//! [`Action::apply_on_dataset`], called once on the first row with the
//! runtime input metadata (which carries statistics when requested).
//!
//! Actions never see the pipeline. The action node around them validates
//! the generic parameters, contains failures and panics, and keeps
//! counters.

pub mod behavior;
pub mod context;
pub mod filter;
pub mod registry;
pub mod step;

pub use behavior::{Behavior, BehaviorSet};
pub use context::{ActionContext, ActionStatus};
pub use filter::RowFilter;
pub use registry::{ActionFactory, ActionRegistry};
pub use step::{parse_steps, steps_to_json, ActionStep, Parameters};

use crate::types::{ColumnMetadata, Row, RowMetadata, SchemaChange};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Granularity an action operates at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    /// A single row, selected by the `row_id` parameter
    Line,
    /// A single column, selected by the `column_id` parameter
    Column,
    /// The whole dataset
    Dataset,
}

impl ActionScope {
    pub fn name(&self) -> &'static str {
        match self {
            ActionScope::Line => "line",
            ActionScope::Column => "column",
            ActionScope::Dataset => "dataset",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" | "row" => Some(ActionScope::Line),
            "column" => Some(ActionScope::Column),
            "dataset" => Some(ActionScope::Dataset),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compile or apply failure of an action. Never fatal to an execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("column '{0}' does not exist")]
    MissingColumn(String),

    #[error("column '{0}' is not supported by this action")]
    UnsupportedColumn(String),

    #[error("scope '{0}' is not supported by this action")]
    UnsupportedScope(String),

    #[error("{0}")]
    Failed(String),

    #[error("action panicked: {0}")]
    Panicked(String),
}

impl ActionError {
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A named row/dataset transformation.
pub trait Action: Send + Sync {
    /// Registry name of this action
    fn name(&self) -> &'static str;

    /// What this action does and needs
    fn behavior(&self) -> BehaviorSet;

    /// Scopes this action supports; the first one is the default
    fn scopes(&self) -> &'static [ActionScope];

    /// Whether the action can operate on this column
    fn accept_field(&self, _column: &ColumnMetadata) -> bool {
        true
    }

    /// One-time setup against the schema in `ctx`
    fn compile(&self, _ctx: &mut ActionContext) -> Result<(), ActionError> {
        Ok(())
    }

    /// Dataset-wide schema edits, decided once from the runtime metadata
    fn apply_on_dataset(
        &self,
        _metadata: &RowMetadata,
        _ctx: &ActionContext,
    ) -> Result<Vec<SchemaChange>, ActionError> {
        Ok(Vec::new())
    }

    /// Transform one eligible row. `metadata` is the output schema of the
    /// action for this row.
    fn apply(
        &self,
        row: &mut Row,
        metadata: &RowMetadata,
        ctx: &ActionContext,
    ) -> Result<(), ActionError>;
}

impl std::fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name())
            .field("behavior", &self.behavior())
            .finish()
    }
}
