//! Column creation, renaming and deletion.

use super::required_column;
use crate::action::{Action, ActionContext, ActionError, ActionScope, Behavior, BehaviorSet};
use crate::types::{Row, RowMetadata};

const COLUMN: &[ActionScope] = &[ActionScope::Column];

/// Copies a column into a new column inserted right after it
pub struct CopyColumn;

struct CopyPlan {
    source: String,
    target: String,
}

impl Action for CopyColumn {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::MetadataCopyColumns])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let source = required_column(ctx)?;
        let (name, data_type) = ctx
            .metadata()
            .column(&source)
            .map(|c| (format!("{}_copy", c.name), c.data_type))
            .ok_or_else(|| ActionError::MissingColumn(source.clone()))?;
        let name = ctx
            .parameters()
            .get_str("new_column_name")
            .map(str::to_string)
            .unwrap_or(name);
        let target = ctx.add_column(name, data_type, Some(&source));
        ctx.put("copy", CopyPlan { source, target });
        Ok(())
    }

    fn apply(&self, row: &mut Row, _: &RowMetadata, ctx: &ActionContext) -> Result<(), ActionError> {
        let copy = ctx
            .get::<CopyPlan>("copy")
            .ok_or_else(|| ActionError::Failed("copy is not compiled".to_string()))?;
        let value = row.get(&copy.source).unwrap_or("").to_string();
        let invalid = row.is_invalid(&copy.source);
        row.set(copy.target.as_str(), value);
        row.set_invalid(&copy.target, invalid);
        Ok(())
    }
}

/// Changes the display name of a column (`new_column_name`)
pub struct RenameColumn;

impl Action for RenameColumn {
    fn name(&self) -> &'static str {
        "rename_column"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::MetadataChangeName])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        let name = ctx.parameters().require_str("new_column_name")?.trim().to_string();
        if name.is_empty() {
            return Err(ActionError::invalid("new_column_name", "must not be blank"));
        }
        ctx.rename_column(&column, name);
        Ok(())
    }

    fn apply(&self, _: &mut Row, _: &RowMetadata, _: &ActionContext) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Removes a column
pub struct DeleteColumn;

impl Action for DeleteColumn {
    fn name(&self) -> &'static str {
        "delete_column"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::MetadataDeleteColumns])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        ctx.remove_column(&column);
        ctx.put("column", column);
        Ok(())
    }

    fn apply(&self, row: &mut Row, _: &RowMetadata, ctx: &ActionContext) -> Result<(), ActionError> {
        if let Some(column) = ctx.get::<String>("column") {
            row.remove(column);
        }
        Ok(())
    }
}
