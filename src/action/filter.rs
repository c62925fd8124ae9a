//! Row filters restricting which rows an action applies to.
//!
//! Filters are externally tagged JSON:
//!
//! ```json
//! { "and": [
//!     { "eq": { "column": "0000", "value": "Ann" } },
//!     { "not": { "empty": { "column": "0001" } } }
//! ] }
//! ```

use super::step::FILTER;
use super::{ActionError, Parameters};
use crate::types::{ColumnId, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    /// Cell equals value
    Eq { column: ColumnId, value: String },
    /// Cell contains value
    Contains { column: ColumnId, value: String },
    /// Cell missing or blank
    Empty { column: ColumnId },
    /// Cell flagged invalid
    Invalid { column: ColumnId },
    /// Cell non-empty and not flagged invalid
    Valid { column: ColumnId },
    And(Vec<RowFilter>),
    Or(Vec<RowFilter>),
    Not(Box<RowFilter>),
}

impl RowFilter {
    pub fn accept(&self, row: &Row) -> bool {
        match self {
            RowFilter::Eq { column, value } => row.get(column) == Some(value.as_str()),
            RowFilter::Contains { column, value } => row
                .get(column)
                .map(|v| v.contains(value.as_str()))
                .unwrap_or(false),
            RowFilter::Empty { column } => row.is_empty_cell(column),
            RowFilter::Invalid { column } => row.is_invalid(column),
            RowFilter::Valid { column } => !row.is_empty_cell(column) && !row.is_invalid(column),
            RowFilter::And(filters) => filters.iter().all(|f| f.accept(row)),
            RowFilter::Or(filters) => filters.iter().any(|f| f.accept(row)),
            RowFilter::Not(filter) => !filter.accept(row),
        }
    }

    /// Column ids referenced anywhere in this filter
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            RowFilter::Eq { column, .. }
            | RowFilter::Contains { column, .. }
            | RowFilter::Empty { column }
            | RowFilter::Invalid { column }
            | RowFilter::Valid { column } => out.push(column.as_str()),
            RowFilter::And(filters) | RowFilter::Or(filters) => {
                filters.iter().for_each(|f| f.collect_columns(out))
            }
            RowFilter::Not(filter) => filter.collect_columns(out),
        }
    }

    /// Read the `filter` parameter, given either as a JSON object or as a
    /// string holding JSON. Absent, null and empty strings mean no filter.
    pub fn from_parameters(parameters: &Parameters) -> Result<Option<RowFilter>, ActionError> {
        let parsed: serde_json::Result<RowFilter> = match parameters.get(FILTER) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => serde_json::from_str(s),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()),
            Some(_) => return Err(ActionError::invalid(FILTER, "expected an object")),
        };
        parsed
            .map(Some)
            .map_err(|e| ActionError::invalid(FILTER, e.to_string()))
    }
}
