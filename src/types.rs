//! Core data types for dataprep-rs
//!
//! This module contains the record and schema types that flow through the
//! transformation pipeline.
//!
//! # Main Types
//!
//! - [`Row`] - A single record: column id → string value, plus row id, deleted
//!   flag, invalid cell flags and an optional diff annotation
//! - [`RowMetadata`] - The ordered column list (schema) a row travels with
//! - [`ColumnMetadata`] - Column id, name, type, quality and statistics
//! - [`DataType`] - Semantic type of a column
//! - [`SchemaChange`] - A single structural edit to a schema
//!
//! # Column Ids
//!
//! Column ids are stable string keys. Columns created by the engine get
//! zero-padded numeric ids (`0000`, `0001`, ...), see
//! [`RowMetadata::next_column_id`].

use crate::analysis::ColumnStatistics;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Stable column identifier.
pub type ColumnId = String;

/// Key used for the row id when a row is serialized.
pub const ROW_ID_KEY: &str = "tdp_id";

/// Semantic type of a column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Free text, every value is valid
    #[default]
    String,
    /// Whole numbers
    Integer,
    /// Decimal numbers
    Decimal,
    /// `true` / `false`
    Boolean,
    /// Calendar dates and timestamps
    Date,
}

impl DataType {
    /// Wire name of this type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }

    /// Parse a type name, accepting a few common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(DataType::String),
            "integer" | "int" | "long" => Some(DataType::Integer),
            "decimal" | "double" | "float" | "numeric" => Some(DataType::Decimal),
            "boolean" | "bool" => Some(DataType::Boolean),
            "date" | "datetime" => Some(DataType::Date),
            _ => None,
        }
    }

    /// Whether values of this type are numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Valid / invalid / empty counters of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quality {
    pub valid: u64,
    pub invalid: u64,
    pub empty: u64,
}

impl Quality {
    /// Number of values counted
    pub fn total(&self) -> u64 {
        self.valid + self.invalid + self.empty
    }

    /// Add another set of counters to this one
    pub fn merge(&mut self, other: &Quality) {
        self.valid += other.valid;
        self.invalid += other.invalid;
        self.empty += other.empty;
    }
}

/// Description of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default)]
    pub statistics: ColumnStatistics,
}

impl ColumnMetadata {
    /// Create a column with empty quality and statistics
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type,
            quality: Quality::default(),
            statistics: ColumnStatistics::default(),
        }
    }
}

/// A single structural edit to a schema.
///
/// Actions record their compile-time schema mutations as a list of changes,
/// so the same edits can be replayed against whatever metadata version a node
/// observes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    /// Insert a column after `after`, or at the end when `after` is `None`
    /// or unknown.
    Add {
        column: ColumnMetadata,
        after: Option<ColumnId>,
    },
    /// Remove a column
    Remove(ColumnId),
    /// Change a column's display name
    Rename { id: ColumnId, name: String },
    /// Change a column's type
    Retype { id: ColumnId, data_type: DataType },
}

/// Ordered column list describing the rows that travel with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowMetadata {
    columns: Vec<ColumnMetadata>,
}

impl RowMetadata {
    /// Create metadata from a column list
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        Self { columns }
    }

    /// Build string columns with generated ids from a list of names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnMetadata::new(format!("{:04}", i), name.as_ref(), DataType::String))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [ColumnMetadata] {
        &mut self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column ids in schema order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// Find a column by display name
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column in schema order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Next free numeric column id.
    ///
    /// Non-numeric ids are ignored when looking for the highest id in use.
    pub fn next_column_id(&self) -> ColumnId {
        let next = self
            .columns
            .iter()
            .filter_map(|c| c.id.parse::<u64>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        format!("{:04}", next)
    }

    /// Append a column at the end of the schema
    pub fn push(&mut self, column: ColumnMetadata) {
        self.columns.push(column);
    }

    /// Remove a column, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<ColumnMetadata> {
        let pos = self.position(id)?;
        Some(self.columns.remove(pos))
    }

    /// Apply a structural edit. Edits that reference unknown columns are
    /// ignored, except `Add`, which falls back to appending.
    pub fn apply_change(&mut self, change: &SchemaChange) {
        match change {
            SchemaChange::Add { column, after } => {
                if self.contains(&column.id) {
                    return;
                }
                let pos = after
                    .as_deref()
                    .and_then(|a| self.position(a))
                    .map(|p| p + 1)
                    .unwrap_or(self.columns.len());
                self.columns.insert(pos, column.clone());
            }
            SchemaChange::Remove(id) => {
                self.remove(id);
            }
            SchemaChange::Rename { id, name } => {
                if let Some(column) = self.column_mut(id) {
                    column.name = name.clone();
                }
            }
            SchemaChange::Retype { id, data_type } => {
                if let Some(column) = self.column_mut(id) {
                    column.data_type = *data_type;
                }
            }
        }
    }
}

/// Diff flag for a row or a cell, computed in diff mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffFlag {
    New,
    Update,
    Delete,
}

/// Diff annotation carried by a row in diff mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowDiff {
    /// Row-level flag (row appeared or disappeared)
    pub row: Option<DiffFlag>,
    /// Cell-level flags by column id
    pub cells: BTreeMap<ColumnId, DiffFlag>,
}

impl RowDiff {
    pub fn is_empty(&self) -> bool {
        self.row.is_none() && self.cells.is_empty()
    }
}

/// A single record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub id: u64,
    cells: BTreeMap<ColumnId, String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    invalid: BTreeSet<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diff: Option<RowDiff>,
}

impl Row {
    /// Create an empty row
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Builder-style cell setter
    pub fn with(mut self, column: impl Into<ColumnId>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(|v| v.as_str())
    }

    pub fn set(&mut self, column: impl Into<ColumnId>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Remove a cell together with its invalid flag
    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.invalid.remove(column);
        self.cells.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Cells ordered by column id
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    pub fn is_invalid(&self, column: &str) -> bool {
        self.invalid.contains(column)
    }

    pub fn set_invalid(&mut self, column: &str, invalid: bool) {
        if invalid {
            self.invalid.insert(column.to_string());
        } else {
            self.invalid.remove(column);
        }
    }

    pub fn invalid_columns(&self) -> impl Iterator<Item = &str> {
        self.invalid.iter().map(|c| c.as_str())
    }

    pub fn diff(&self) -> Option<&RowDiff> {
        self.diff.as_ref()
    }

    pub fn set_diff(&mut self, diff: Option<RowDiff>) {
        self.diff = diff.filter(|d| !d.is_empty());
    }

    /// Whether the cell is missing or blank
    pub fn is_empty_cell(&self, column: &str) -> bool {
        self.get(column).map(|v| v.trim().is_empty()).unwrap_or(true)
    }

    /// Column ids of cells that have no column in `metadata`
    pub fn orphan_columns<'a>(&'a self, metadata: &RowMetadata) -> Vec<&'a str> {
        self.column_ids().filter(|id| !metadata.contains(id)).collect()
    }

    /// Values in schema order, missing cells rendered as empty strings
    pub fn values<'a>(&'a self, metadata: &'a RowMetadata) -> impl Iterator<Item = &'a str> {
        metadata.ids().map(move |id| self.get(id).unwrap_or(""))
    }

    /// Serializable view of this row laid out in schema order
    pub fn view<'a>(&'a self, metadata: &'a RowMetadata) -> RowView<'a> {
        RowView {
            row: self,
            metadata,
        }
    }
}

/// Serializes a row as a JSON object in schema order, row id first.
pub struct RowView<'a> {
    row: &'a Row,
    metadata: &'a RowMetadata,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metadata.len() + 1))?;
        map.serialize_entry(ROW_ID_KEY, &self.row.id)?;
        for (id, value) in self.metadata.ids().zip(self.row.values(self.metadata)) {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}
