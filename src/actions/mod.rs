//! Built-in reference actions.
//!
//! A small set of actions covering every engine path: value edits,
//! column creation/rename/deletion, type changes, row deletion and a
//! dataset-scope action driven by statistics. Each action is a unit struct;
//! shared plumbing lives in the free helpers below.

pub mod cleanup;
pub mod columns;
pub mod convert;
pub mod text;

pub use cleanup::{DeleteAllEmptyColumns, DeleteEmpty, DeleteInvalid};
pub use columns::{CopyColumn, DeleteColumn, RenameColumn};
pub use convert::TypeChange;
pub use text::{FillEmpty, Lowercase, Uppercase};

use crate::action::step::COLUMN_ID;
use crate::action::{Action, ActionContext, ActionError, ActionFactory};
use crate::types::{Row, RowMetadata};
use std::sync::Arc;

/// Name → factory of every built-in action
pub const BUILTIN: &[(&str, ActionFactory)] = &[
    ("uppercase", uppercase),
    ("lowercase", lowercase),
    ("fill_empty", fill_empty),
    ("type_change", type_change),
    ("copy", copy),
    ("rename_column", rename_column),
    ("delete_column", delete_column),
    ("delete_empty", delete_empty),
    ("delete_invalid", delete_invalid),
    ("delete_all_empty_columns", delete_all_empty_columns),
];

pub fn uppercase() -> Arc<dyn Action> {
    Arc::new(Uppercase)
}

pub fn lowercase() -> Arc<dyn Action> {
    Arc::new(Lowercase)
}

pub fn fill_empty() -> Arc<dyn Action> {
    Arc::new(FillEmpty)
}

pub fn type_change() -> Arc<dyn Action> {
    Arc::new(TypeChange)
}

pub fn copy() -> Arc<dyn Action> {
    Arc::new(CopyColumn)
}

pub fn rename_column() -> Arc<dyn Action> {
    Arc::new(RenameColumn)
}

pub fn delete_column() -> Arc<dyn Action> {
    Arc::new(DeleteColumn)
}

pub fn delete_empty() -> Arc<dyn Action> {
    Arc::new(DeleteEmpty)
}

pub fn delete_invalid() -> Arc<dyn Action> {
    Arc::new(DeleteInvalid)
}

pub fn delete_all_empty_columns() -> Arc<dyn Action> {
    Arc::new(DeleteAllEmptyColumns)
}

/// The `column_id` parameter, which must name a column of the working schema
pub(crate) fn required_column(ctx: &ActionContext) -> Result<String, ActionError> {
    let id = ctx
        .column_id()
        .ok_or_else(|| ActionError::MissingParameter(COLUMN_ID.to_string()))?;
    if !ctx.metadata().contains(id) {
        return Err(ActionError::MissingColumn(id.to_string()));
    }
    Ok(id.to_string())
}

/// The `column_id` column when given, every column of `metadata` otherwise
pub(crate) fn target_columns<'a>(ctx: &'a ActionContext, metadata: &'a RowMetadata) -> Vec<&'a str> {
    match ctx.column_id() {
        Some(id) => vec![id],
        None => metadata.ids().collect(),
    }
}

/// Replace the value of a non-empty cell
pub(crate) fn map_cell(row: &mut Row, column: &str, f: impl FnOnce(&str) -> String) {
    if let Some(value) = row.get(column) {
        if !value.is_empty() {
            let mapped = f(value);
            row.set(column, mapped);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers to compile and apply an action outside a pipeline.

    use crate::action::{Action, ActionContext, ActionError, Parameters};
    use crate::types::{Row, RowMetadata};

    pub fn compile(
        action: &dyn Action,
        parameters: Parameters,
        metadata: &RowMetadata,
    ) -> Result<ActionContext, ActionError> {
        let mut ctx = ActionContext::new(parameters, metadata.clone());
        action.compile(&mut ctx)?;
        Ok(ctx)
    }

    pub fn apply(action: &dyn Action, ctx: &ActionContext, mut row: Row) -> Row {
        let metadata = ctx.metadata().clone();
        action
            .apply(&mut row, &metadata, ctx)
            .expect("apply should succeed");
        row
    }
}
