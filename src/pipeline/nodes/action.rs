//! ActionNode: runs one compiled action.
//!
//! The node owns the generic part of the action contract:
//! - parameter validation before `compile` (scope, column, row id, filter)
//! - one `apply_on_dataset` call on the first row
//! - a run-time skip when a column the step reads was removed upstream
//!   while rows were flowing (the step then passes rows through)
//! - output metadata derived from the input metadata of each row by
//!   replaying the recorded schema changes
//! - failure containment: `apply` runs on a copy of the row, an error or a
//!   panic leaves the original row untouched and bumps the error counter
//!
//! Partition copies share the compiled context and the first-row
//! decisions; only the counters are per copy and get absorbed back.

use crate::action::step::{COLUMN_ID, ROW_ID};
use crate::action::{
    Action, ActionContext, ActionError, ActionScope, ActionStatus, Parameters, RowFilter,
};
use crate::pipeline::packet::{Packet, RowPacket, Signal};
use crate::pipeline::report::{ActionReport, Branch};
use crate::pipeline::PipelineResult;
use crate::types::{RowMetadata, SchemaChange};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Row counters of an action node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionCounters {
    pub rows_seen: u64,
    pub rows_applied: u64,
    pub errors: u64,
}

pub struct ActionNode {
    index: usize,
    branch: Branch,
    action: Arc<dyn Action>,
    context: Arc<ActionContext>,
    dataset_changes: Arc<OnceLock<Vec<SchemaChange>>>,
    /// Set on the first row: why the step is skipped for this run, if it is
    runtime_skip: Arc<OnceLock<Option<String>>>,
    /// Last input metadata and the output derived from it
    output: Option<(Arc<RowMetadata>, Arc<RowMetadata>)>,
    counters: ActionCounters,
    failure_logged: bool,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, turning a panic into [`ActionError::Panicked`]
fn contained<T>(f: impl FnOnce() -> Result<T, ActionError>) -> Result<T, ActionError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ActionError::Panicked(panic_message(payload))),
    }
}

fn default_scope(scopes: &[ActionScope], parameters: &Parameters) -> ActionScope {
    let preferred = if parameters.contains(ROW_ID) {
        ActionScope::Line
    } else if parameters.column_id().is_some() {
        ActionScope::Column
    } else {
        ActionScope::Dataset
    };
    if scopes.contains(&preferred) {
        preferred
    } else {
        scopes.first().copied().unwrap_or(ActionScope::Dataset)
    }
}

/// First column read by the step that `input` does not have
fn missing_column<'a>(ctx: &'a ActionContext, input: &RowMetadata) -> Option<&'a str> {
    let filter_columns = ctx.filter().map(RowFilter::columns).unwrap_or_default();
    ctx.column_id()
        .into_iter()
        .chain(filter_columns)
        .find(|id| !input.contains(id))
}

/// Generic validation, then the action's own compile
fn prepare(action: &dyn Action, ctx: &mut ActionContext) -> Result<(), ActionError> {
    let parameters = ctx.parameters().clone();

    let scope = match parameters.scope()? {
        Some(scope) if action.scopes().contains(&scope) => scope,
        Some(scope) => return Err(ActionError::UnsupportedScope(scope.name().to_string())),
        None => default_scope(action.scopes(), &parameters),
    };

    match parameters.column_id() {
        Some(id) => {
            let column = ctx
                .metadata()
                .column(id)
                .ok_or_else(|| ActionError::MissingColumn(id.to_string()))?;
            if !action.accept_field(column) {
                return Err(ActionError::UnsupportedColumn(id.to_string()));
            }
        }
        None if scope == ActionScope::Column => {
            return Err(ActionError::MissingParameter(COLUMN_ID.to_string()))
        }
        None => {}
    }

    let row_id = parameters.row_id()?;
    if scope == ActionScope::Line && row_id.is_none() {
        return Err(ActionError::MissingParameter(ROW_ID.to_string()));
    }

    let filter = RowFilter::from_parameters(&parameters)?;
    if let Some(filter) = &filter {
        if let Some(missing) = filter.columns().into_iter().find(|c| !ctx.metadata().contains(c)) {
            return Err(ActionError::MissingColumn(missing.to_string()));
        }
    }

    ctx.set_scope(scope, row_id);
    ctx.set_filter(filter);
    action.compile(ctx)
}

impl ActionNode {
    /// Compile `action` against `schema`.
    ///
    /// Returns the node and the schema after the action. A compile failure
    /// never fails the build: the node is marked not executed, passes rows
    /// through, and the schema is returned unchanged.
    pub fn compile(
        index: usize,
        branch: Branch,
        action: Arc<dyn Action>,
        parameters: Parameters,
        schema: &RowMetadata,
    ) -> (Self, RowMetadata) {
        let mut ctx = ActionContext::new(parameters.clone(), schema.clone());
        let result = contained(|| prepare(action.as_ref(), &mut ctx));

        let (ctx, output) = match result {
            Ok(()) => {
                debug!(
                    "Compiled action #{} '{}' ({} schema changes)",
                    index,
                    action.name(),
                    ctx.changes().len()
                );
                let output = ctx.metadata().clone();
                (ctx, output)
            }
            Err(e) => {
                warn!("Action #{} '{}' not executed: {}", index, action.name(), e);
                let mut skipped = ActionContext::new(parameters, schema.clone());
                skipped.set_status(ActionStatus::NotExecuted {
                    reason: e.to_string(),
                });
                (skipped, schema.clone())
            }
        };

        let node = Self {
            index,
            branch,
            action,
            context: Arc::new(ctx),
            dataset_changes: Arc::new(OnceLock::new()),
            runtime_skip: Arc::new(OnceLock::new()),
            output: None,
            counters: ActionCounters::default(),
            failure_logged: false,
        };
        (node, output)
    }

    pub fn name(&self) -> &str {
        "Action"
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    pub fn status(&self) -> &ActionStatus {
        self.context.status()
    }

    /// Why rows pass through untouched, from compile or from the first row
    pub fn skip_reason(&self) -> Option<&str> {
        self.status()
            .skip_reason()
            .or_else(|| self.runtime_skip.get().and_then(Option::as_deref))
    }

    pub fn counters(&self) -> ActionCounters {
        self.counters
    }

    pub fn report(&self) -> ActionReport {
        ActionReport {
            index: self.index,
            branch: self.branch,
            action: self.action.name().to_string(),
            compiled: self.skip_reason().is_none(),
            skip_reason: self.skip_reason().map(str::to_string),
            rows_seen: self.counters.rows_seen,
            rows_applied: self.counters.rows_applied,
            errors: self.counters.errors,
        }
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => {
                let p = self.process(p);
                out.push(Packet::Row(p));
            }
            other => out.push(other),
        }
        Ok(())
    }

    pub fn on_signal(&mut self, signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        if signal.flushes() && self.skip_reason().is_none() {
            info!(
                "Action #{} '{}': {} rows seen, {} applied, {} errors",
                self.index,
                self.action.name(),
                self.counters.rows_seen,
                self.counters.rows_applied,
                self.counters.errors
            );
        }
        Ok(())
    }

    fn process(&mut self, packet: RowPacket) -> RowPacket {
        self.counters.rows_seen += 1;
        if !self.status().is_compiled() || self.skipped_at_runtime(&packet.metadata) {
            return packet;
        }

        let metadata = self.output_metadata(&packet.metadata);
        let row = packet.row;
        if !self.context.accepts(&row) {
            return RowPacket::new(row, metadata);
        }

        let mut candidate = row.clone();
        let action = &self.action;
        let context = &self.context;
        let result = contained(|| action.apply(&mut candidate, &metadata, context));
        match result {
            Ok(()) => {
                self.counters.rows_applied += 1;
                RowPacket::new(candidate, metadata)
            }
            Err(e) => {
                self.record_failure(&format!("row {}", row.id), &e);
                RowPacket::new(row, metadata)
            }
        }
    }

    fn record_failure(&mut self, subject: &str, error: &ActionError) {
        self.counters.errors += 1;
        if self.failure_logged {
            debug!(
                "Action #{} '{}' failed on {}: {}",
                self.index,
                self.action.name(),
                subject,
                error
            );
        } else {
            self.failure_logged = true;
            warn!(
                "Action #{} '{}' failed on {}: {} (further failures logged at debug)",
                self.index,
                self.action.name(),
                subject,
                error
            );
        }
    }

    /// Decided once per run against the metadata of the first row
    fn skipped_at_runtime(&self, input: &RowMetadata) -> bool {
        self.runtime_skip
            .get_or_init(|| {
                missing_column(&self.context, input).map(|id| {
                    let reason = ActionError::MissingColumn(id.to_string()).to_string();
                    warn!(
                        "Action #{} '{}' not executed: {}",
                        self.index,
                        self.action.name(),
                        reason
                    );
                    reason
                })
            })
            .is_some()
    }

    /// Output schema for rows arriving with `input`
    fn output_metadata(&mut self, input: &Arc<RowMetadata>) -> Arc<RowMetadata> {
        if let Some((cached_in, cached_out)) = &self.output {
            if Arc::ptr_eq(cached_in, input) {
                return cached_out.clone();
            }
        }

        let mut failure = None;
        let action = &self.action;
        let context = &self.context;
        let dataset = self.dataset_changes.get_or_init(|| {
            match contained(|| action.apply_on_dataset(input, context)) {
                Ok(changes) => changes,
                Err(e) => {
                    failure = Some(e);
                    Vec::new()
                }
            }
        });

        let output = if self.context.changes().is_empty() && dataset.is_empty() {
            input.clone()
        } else {
            let mut metadata = (**input).clone();
            for change in self.context.changes().iter().chain(dataset.iter()) {
                metadata.apply_change(change);
            }
            Arc::new(metadata)
        };

        if let Some(e) = failure {
            self.record_failure("dataset", &e);
        }
        self.output = Some((input.clone(), output.clone()));
        output
    }

    /// Copy sharing the compiled state and the dataset decision
    pub fn partition_copy(&self) -> Self {
        Self {
            index: self.index,
            branch: self.branch,
            action: self.action.clone(),
            context: self.context.clone(),
            dataset_changes: self.dataset_changes.clone(),
            runtime_skip: self.runtime_skip.clone(),
            output: None,
            counters: ActionCounters::default(),
            failure_logged: self.failure_logged,
        }
    }

    /// Copy sharing the compiled state, for another execution
    pub fn fresh_copy(&self) -> Self {
        Self {
            dataset_changes: Arc::new(OnceLock::new()),
            runtime_skip: Arc::new(OnceLock::new()),
            failure_logged: false,
            ..self.partition_copy()
        }
    }

    pub fn absorb(&mut self, other: ActionNode) {
        self.counters.rows_seen += other.counters.rows_seen;
        self.counters.rows_applied += other.counters.rows_applied;
        self.counters.errors += other.counters.errors;
        self.failure_logged |= other.failure_logged;
    }
}

impl std::fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionNode")
            .field("index", &self.index)
            .field("branch", &self.branch)
            .field("action", &self.action.name())
            .field("status", self.status())
            .field("skip_reason", &self.skip_reason())
            .field("counters", &self.counters)
            .finish()
    }
}
