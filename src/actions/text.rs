//! Value edits on a single column.

use super::{map_cell, required_column};
use crate::action::{Action, ActionContext, ActionError, ActionScope, Behavior, BehaviorSet};
use crate::types::{ColumnMetadata, DataType, Row, RowMetadata};

const VALUES_COLUMN: BehaviorSet = BehaviorSet::of(&[Behavior::ValuesColumn]);
const COLUMN_OR_LINE: &[ActionScope] = &[ActionScope::Column, ActionScope::Line];

/// Upper-cases the values of a text column
pub struct Uppercase;

impl Action for Uppercase {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn behavior(&self) -> BehaviorSet {
        VALUES_COLUMN
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN_OR_LINE
    }

    fn accept_field(&self, column: &ColumnMetadata) -> bool {
        column.data_type == DataType::String
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        ctx.put("column", column);
        Ok(())
    }

    fn apply(&self, row: &mut Row, _: &RowMetadata, ctx: &ActionContext) -> Result<(), ActionError> {
        if let Some(column) = ctx.get::<String>("column") {
            map_cell(row, column, str::to_uppercase);
        }
        Ok(())
    }
}

/// Lower-cases the values of a text column
pub struct Lowercase;

impl Action for Lowercase {
    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn behavior(&self) -> BehaviorSet {
        VALUES_COLUMN
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN_OR_LINE
    }

    fn accept_field(&self, column: &ColumnMetadata) -> bool {
        column.data_type == DataType::String
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        ctx.put("column", column);
        Ok(())
    }

    fn apply(&self, row: &mut Row, _: &RowMetadata, ctx: &ActionContext) -> Result<(), ActionError> {
        if let Some(column) = ctx.get::<String>("column") {
            map_cell(row, column, str::to_lowercase);
        }
        Ok(())
    }
}

/// Replaces blank cells of a column with the `value` parameter
pub struct FillEmpty;

struct Fill {
    column: String,
    value: String,
}

impl Action for FillEmpty {
    fn name(&self) -> &'static str {
        "fill_empty"
    }

    fn behavior(&self) -> BehaviorSet {
        VALUES_COLUMN
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN_OR_LINE
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        let value = ctx.parameters().require_str("value")?.to_string();
        ctx.put("fill", Fill { column, value });
        Ok(())
    }

    fn apply(&self, row: &mut Row, _: &RowMetadata, ctx: &ActionContext) -> Result<(), ActionError> {
        let fill = ctx
            .get::<Fill>("fill")
            .ok_or_else(|| ActionError::Failed("fill_empty is not compiled".to_string()))?;
        if row.is_empty_cell(&fill.column) {
            row.set(fill.column.as_str(), fill.value.as_str());
            row.set_invalid(&fill.column, false);
        }
        Ok(())
    }
}
