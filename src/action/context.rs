//! Compile-time context of an action.
//!
//! The context carries the parameters, the working schema and any state the
//! action cached during compile. It is built once per action node and shared
//! read-only by every `apply` call afterwards; partition copies of a node
//! clone it, which only clones the `Arc`s of the cached state.

use super::{ActionScope, Parameters, RowFilter};
use crate::types::{ColumnId, ColumnMetadata, DataType, Row, RowMetadata, SchemaChange};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of compiling an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// Compiled; the action will run
    Compiled,
    /// Skipped; rows pass through untouched
    NotExecuted { reason: String },
}

impl ActionStatus {
    pub fn is_compiled(&self) -> bool {
        matches!(self, ActionStatus::Compiled)
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            ActionStatus::Compiled => None,
            ActionStatus::NotExecuted { reason } => Some(reason),
        }
    }
}

#[derive(Clone)]
pub struct ActionContext {
    parameters: Parameters,
    metadata: RowMetadata,
    status: ActionStatus,
    scope: ActionScope,
    row_id: Option<u64>,
    filter: Option<RowFilter>,
    changes: Vec<SchemaChange>,
    state: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ActionContext {
    /// Context over a copy of the input schema
    pub fn new(parameters: Parameters, metadata: RowMetadata) -> Self {
        Self {
            parameters,
            metadata,
            status: ActionStatus::Compiled,
            scope: ActionScope::Dataset,
            row_id: None,
            filter: None,
            changes: Vec::new(),
            state: HashMap::new(),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Working schema; after compile, the output schema of the action
    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn status(&self) -> &ActionStatus {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: ActionStatus) {
        self.status = status;
    }

    pub fn scope(&self) -> ActionScope {
        self.scope
    }

    pub(crate) fn set_scope(&mut self, scope: ActionScope, row_id: Option<u64>) {
        self.scope = scope;
        self.row_id = row_id;
    }

    pub fn filter(&self) -> Option<&RowFilter> {
        self.filter.as_ref()
    }

    pub(crate) fn set_filter(&mut self, filter: Option<RowFilter>) {
        self.filter = filter;
    }

    /// The `column_id` parameter
    pub fn column_id(&self) -> Option<&str> {
        self.parameters.column_id()
    }

    /// Metadata of the `column_id` column in the working schema
    pub fn column(&self) -> Option<&ColumnMetadata> {
        self.column_id().and_then(|id| self.metadata.column(id))
    }

    /// Schema edits recorded during compile
    pub fn changes(&self) -> &[SchemaChange] {
        &self.changes
    }

    /// Whether the action applies to this row: not deleted, matching the
    /// `line` scope row id and the filter.
    pub fn accepts(&self, row: &Row) -> bool {
        if row.is_deleted() {
            return false;
        }
        if self.scope == ActionScope::Line && self.row_id != Some(row.id) {
            return false;
        }
        self.filter.as_ref().map(|f| f.accept(row)).unwrap_or(true)
    }

    fn record(&mut self, change: SchemaChange) {
        self.metadata.apply_change(&change);
        self.changes.push(change);
    }

    /// Create a column after `after` (or at the end), returning its id
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        after: Option<&str>,
    ) -> ColumnId {
        let id = self.metadata.next_column_id();
        self.record(SchemaChange::Add {
            column: ColumnMetadata::new(id.clone(), name, data_type),
            after: after.map(str::to_string),
        });
        id
    }

    pub fn remove_column(&mut self, id: &str) {
        self.record(SchemaChange::Remove(id.to_string()));
    }

    pub fn rename_column(&mut self, id: &str, name: impl Into<String>) {
        self.record(SchemaChange::Rename {
            id: id.to_string(),
            name: name.into(),
        });
    }

    pub fn change_type(&mut self, id: &str, data_type: DataType) {
        self.record(SchemaChange::Retype {
            id: id.to_string(),
            data_type,
        });
    }

    /// Cache compiled state under `key`
    pub fn put<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.state.insert(key.into(), Arc::new(value));
    }

    /// Read compiled state cached under `key`
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.state.get(key).and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.state.keys().collect();
        keys.sort();
        f.debug_struct("ActionContext")
            .field("parameters", &self.parameters)
            .field("status", &self.status)
            .field("scope", &self.scope)
            .field("row_id", &self.row_id)
            .field("filter", &self.filter)
            .field("changes", &self.changes)
            .field("state", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ActionContext {
        ActionContext::new(
            Parameters::new().with("column_id", "0000"),
            RowMetadata::from_names(&["name", "age"]),
        )
    }

    #[test]
    fn test_schema_edits_are_recorded() {
        let mut ctx = context();
        let id = ctx.add_column("name_copy", DataType::String, Some("0000"));
        ctx.rename_column("0001", "years");
        ctx.change_type("0001", DataType::Integer);

        assert_eq!(id, "0002");
        assert_eq!(ctx.changes().len(), 3);
        assert_eq!(
            ctx.metadata().ids().collect::<Vec<_>>(),
            vec!["0000", "0002", "0001"]
        );

        // Replaying the recorded changes on the input gives the same schema
        let mut replayed = RowMetadata::from_names(&["name", "age"]);
        for change in ctx.changes() {
            replayed.apply_change(change);
        }
        assert_eq!(&replayed, ctx.metadata());
    }

    #[test]
    fn test_state_round_trip() {
        let mut ctx = context();
        ctx.put("target", String::from("0002"));
        assert_eq!(ctx.get::<String>("target").map(String::as_str), Some("0002"));
        assert!(ctx.get::<u64>("target").is_none());
        assert!(ctx.clone().get::<String>("target").is_some());
    }

    #[test]
    fn test_accepts_line_scope_and_deleted() {
        let mut ctx = context();
        ctx.set_scope(ActionScope::Line, Some(2));
        assert!(!ctx.accepts(&Row::new(1)));
        assert!(ctx.accepts(&Row::new(2)));

        let mut deleted = Row::new(2);
        deleted.set_deleted(true);
        assert!(!ctx.accepts(&deleted));
    }

    #[test]
    fn test_column_lookup() {
        let ctx = context();
        assert_eq!(ctx.column().map(|c| c.name.as_str()), Some("name"));
    }
}
