//! Column type changes.

use super::required_column;
use crate::action::{Action, ActionContext, ActionError, ActionScope, Behavior, BehaviorSet};
use crate::types::{DataType, Row, RowMetadata};

/// Changes the declared type of a column (`new_type`). Values are left
/// untouched; validity is re-evaluated downstream.
pub struct TypeChange;

impl Action for TypeChange {
    fn name(&self) -> &'static str {
        "type_change"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::MetadataChangeType])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        &[ActionScope::Column]
    }

    fn compile(&self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        let column = required_column(ctx)?;
        let name = ctx.parameters().require_str("new_type")?;
        let data_type = DataType::from_name(name)
            .ok_or_else(|| ActionError::invalid("new_type", format!("unknown type '{}'", name)))?;
        ctx.change_type(&column, data_type);
        Ok(())
    }

    fn apply(&self, _: &mut Row, _: &RowMetadata, _: &ActionContext) -> Result<(), ActionError> {
        Ok(())
    }
}
