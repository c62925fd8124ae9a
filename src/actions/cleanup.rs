//! Row and column deletion.

use super::target_columns;
use crate::action::{Action, ActionContext, ActionError, ActionScope, Behavior, BehaviorSet};
use crate::types::{Row, RowMetadata, SchemaChange};

const COLUMN_OR_DATASET: &[ActionScope] = &[ActionScope::Column, ActionScope::Dataset];

/// Deletes rows having an empty cell in `column_id`, or in any column when
/// no column is given
pub struct DeleteEmpty;

impl Action for DeleteEmpty {
    fn name(&self) -> &'static str {
        "delete_empty"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::DeleteRows])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN_OR_DATASET
    }

    fn apply(
        &self,
        row: &mut Row,
        metadata: &RowMetadata,
        ctx: &ActionContext,
    ) -> Result<(), ActionError> {
        if target_columns(ctx, metadata)
            .iter()
            .any(|c| row.is_empty_cell(c))
        {
            row.set_deleted(true);
        }
        Ok(())
    }
}

/// Deletes rows having an invalid cell in `column_id`, or in any column
/// when no column is given
pub struct DeleteInvalid;

impl Action for DeleteInvalid {
    fn name(&self) -> &'static str {
        "delete_invalid"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[Behavior::DeleteRows, Behavior::NeedStatisticsInvalid])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        COLUMN_OR_DATASET
    }

    fn apply(
        &self,
        row: &mut Row,
        metadata: &RowMetadata,
        ctx: &ActionContext,
    ) -> Result<(), ActionError> {
        if target_columns(ctx, metadata)
            .iter()
            .any(|c| row.is_invalid(c))
        {
            row.set_deleted(true);
        }
        Ok(())
    }
}

/// Removes every column whose values are all empty, according to the
/// quality statistics of the input
pub struct DeleteAllEmptyColumns;

impl Action for DeleteAllEmptyColumns {
    fn name(&self) -> &'static str {
        "delete_all_empty_columns"
    }

    fn behavior(&self) -> BehaviorSet {
        BehaviorSet::of(&[
            Behavior::NeedStatisticsQuality,
            Behavior::MetadataDeleteColumns,
        ])
    }

    fn scopes(&self) -> &'static [ActionScope] {
        &[ActionScope::Dataset]
    }

    fn apply_on_dataset(
        &self,
        metadata: &RowMetadata,
        _: &ActionContext,
    ) -> Result<Vec<SchemaChange>, ActionError> {
        Ok(metadata
            .columns()
            .iter()
            .filter(|c| c.quality.total() > 0 && c.quality.empty == c.quality.total())
            .map(|c| SchemaChange::Remove(c.id.clone()))
            .collect())
    }

    fn apply(&self, _: &mut Row, _: &RowMetadata, _: &ActionContext) -> Result<(), ActionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Parameters;
    use crate::actions::testing::{apply, compile};
    use crate::types::Quality;

    fn metadata() -> RowMetadata {
        RowMetadata::from_names(&["name", "age"])
    }

    #[test]
    fn test_delete_empty_on_column() {
        let params = Parameters::new().with("column_id", "0001");
        let ctx = compile(&DeleteEmpty, params, &metadata()).unwrap();
        assert!(apply(&DeleteEmpty, &ctx, Row::new(1).with("0000", "a")).is_deleted());
        assert!(!apply(&DeleteEmpty, &ctx, Row::new(2).with("0001", "3")).is_deleted());
    }

    #[test]
    fn test_delete_empty_on_dataset() {
        let ctx = compile(&DeleteEmpty, Parameters::new(), &metadata()).unwrap();
        assert!(apply(&DeleteEmpty, &ctx, Row::new(1).with("0001", "3")).is_deleted());
        let full = Row::new(2).with("0000", "a").with("0001", "3");
        assert!(!apply(&DeleteEmpty, &ctx, full).is_deleted());
    }

    #[test]
    fn test_delete_invalid() {
        let ctx = compile(&DeleteInvalid, Parameters::new(), &metadata()).unwrap();
        let mut row = Row::new(1).with("0001", "abc");
        row.set_invalid("0001", true);
        assert!(apply(&DeleteInvalid, &ctx, row).is_deleted());
    }

    #[test]
    fn test_delete_all_empty_columns_uses_quality() {
        let mut md = metadata();
        md.column_mut("0000").unwrap().quality = Quality {
            valid: 2,
            invalid: 0,
            empty: 0,
        };
        md.column_mut("0001").unwrap().quality = Quality {
            valid: 0,
            invalid: 0,
            empty: 2,
        };
        let ctx = compile(&DeleteAllEmptyColumns, Parameters::new(), &md).unwrap();
        let changes = DeleteAllEmptyColumns.apply_on_dataset(&md, &ctx).unwrap();
        assert_eq!(changes, vec![SchemaChange::Remove("0001".into())]);
    }

    #[test]
    fn test_delete_all_empty_columns_without_statistics() {
        let md = metadata();
        let ctx = compile(&DeleteAllEmptyColumns, Parameters::new(), &md).unwrap();
        assert!(DeleteAllEmptyColumns
            .apply_on_dataset(&md, &ctx)
            .unwrap()
            .is_empty());
    }
}
