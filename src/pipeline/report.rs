//! Execution reports.
//!
//! Every execution, successful or not, produces an [`ExecutionReport`]:
//! per-action compile status and row counters, rows read, outcome and
//! runtime. A failed execution carries its report inside
//! [`ExecutionFailure`].

use crate::action::ActionStatus;
use crate::config::RuntimeKind;
use crate::pipeline::PipelineError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Branch of the graph an action node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// The only branch outside diff mode
    Main,
    /// Diff mode: the steps before the previewed ones
    Reference,
    /// Diff mode: every step
    Preview,
}

impl Branch {
    pub fn name(&self) -> &'static str {
        match self {
            Branch::Main => "main",
            Branch::Reference => "reference",
            Branch::Preview => "preview",
        }
    }
}

/// Status and counters of one action node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    /// Position of the action in the action list
    pub index: usize,
    pub branch: Branch,
    pub action: String,
    pub compiled: bool,
    pub skip_reason: Option<String>,
    pub rows_seen: u64,
    pub rows_applied: u64,
    pub errors: u64,
}

impl ActionReport {
    pub fn status(&self) -> ActionStatus {
        match &self.skip_reason {
            None => ActionStatus::Compiled,
            Some(reason) => ActionStatus::NotExecuted {
                reason: reason.clone(),
            },
        }
    }

    /// Compiled, and no row failed
    pub fn is_clean(&self) -> bool {
        self.compiled && self.errors == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub runtime: RuntimeKind,
    pub outcome: Outcome,
    pub rows_read: u64,
    pub actions: Vec<ActionReport>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ExecutionReport {
    pub fn new(runtime: RuntimeKind) -> Self {
        Self {
            runtime,
            outcome: Outcome::Completed,
            rows_read: 0,
            actions: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Row failures across every action
    pub fn total_errors(&self) -> u64 {
        self.actions.iter().map(|a| a.errors).sum()
    }

    /// First action that was skipped or failed on some row
    pub fn first_degraded_action(&self) -> Option<&ActionReport> {
        self.actions.iter().find(|a| !a.is_clean())
    }

    /// Last action of the leading run of clean actions
    pub fn last_completed_action(&self) -> Option<&ActionReport> {
        self.actions.iter().take_while(|a| a.is_clean()).last()
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} on {} runtime: {} rows read in {} ms",
            self.outcome,
            self.runtime,
            self.rows_read,
            self.elapsed.as_millis()
        )?;
        for a in &self.actions {
            write!(
                f,
                "  #{} {} [{}] seen={} applied={} errors={}",
                a.index,
                a.action,
                a.branch.name(),
                a.rows_seen,
                a.rows_applied,
                a.errors
            )?;
            if let Some(reason) = &a.skip_reason {
                write!(f, " skipped: {}", reason)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Fatal execution error together with what was done before it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ExecutionFailure {
    #[source]
    pub error: PipelineError,
    pub report: ExecutionReport,
}

impl ExecutionFailure {
    pub fn new(error: PipelineError, report: ExecutionReport) -> Self {
        Self { error, report }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, PipelineError::Cancelled)
    }
}

impl From<ExecutionFailure> for PipelineError {
    fn from(failure: ExecutionFailure) -> Self {
        failure.error
    }
}
