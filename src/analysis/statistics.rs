//! Per-column statistics and their accumulator.
//!
//! Accumulators are built per partition and combined with
//! [`StatisticsAccumulator::merge`]. Every counter is an integer sum, every
//! table a keyed sum and the numeric summary a min/max over finite values,
//! so merging is commutative and associative: any partitioning of the same
//! rows yields the same result.

use super::validity::{is_valid, parse_number, pattern_of};
use crate::config::StatisticsSettings;
use crate::types::{ColumnId, Quality, Row, RowMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count, min and max of the finite numeric values of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

impl NumericSummary {
    fn of(value: f64) -> Self {
        Self {
            count: 1,
            min: value,
            max: value,
        }
    }

    fn merge(&mut self, other: &NumericSummary) {
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Statistics of a single column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of non-empty values
    #[serde(default)]
    pub count: u64,
    /// Value → occurrences
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub frequencies: BTreeMap<String, u64>,
    /// Pattern → occurrences
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patterns: BTreeMap<String, u64>,
    /// Summary of valid values of numeric columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

impl ColumnStatistics {
    /// Combine another column's statistics into this one
    pub fn merge(&mut self, other: &ColumnStatistics) {
        self.count += other.count;
        merge_table(&mut self.frequencies, &other.frequencies);
        merge_table(&mut self.patterns, &other.patterns);
        self.numeric = match (self.numeric, other.numeric) {
            (Some(mut a), Some(b)) => {
                a.merge(&b);
                Some(a)
            }
            (a, b) => a.or(b),
        };
    }

    /// Most frequent value, ties broken by value order
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.frequencies
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

fn merge_table(into: &mut BTreeMap<String, u64>, from: &BTreeMap<String, u64>) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ColumnAccumulator {
    quality: Quality,
    statistics: ColumnStatistics,
}

impl ColumnAccumulator {
    fn merge(&mut self, other: &ColumnAccumulator) {
        self.quality.merge(&other.quality);
        self.statistics.merge(&other.statistics);
    }
}

/// Accumulates quality counters and statistics over rows.
///
/// Deleted rows are not counted. A cell is *empty* when missing or blank,
/// *invalid* when non-empty and rejected by the column type's validity
/// predicate, *valid* otherwise, so for every column
/// `valid + invalid + empty == rows()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsAccumulator {
    settings: StatisticsSettings,
    rows: u64,
    columns: BTreeMap<ColumnId, ColumnAccumulator>,
}

impl StatisticsAccumulator {
    pub fn new(settings: StatisticsSettings) -> Self {
        Self {
            settings,
            rows: 0,
            columns: BTreeMap::new(),
        }
    }

    /// Number of non-deleted rows accepted
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Fresh accumulator with the same settings
    pub fn empty_like(&self) -> Self {
        Self::new(self.settings.clone())
    }

    /// Count one row against `metadata`
    pub fn accept(&mut self, row: &Row, metadata: &RowMetadata) {
        if row.is_deleted() {
            return;
        }
        self.rows += 1;

        for column in metadata.columns() {
            let acc = self.columns.entry(column.id.clone()).or_default();
            let value = match row.get(&column.id).map(str::trim) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    acc.quality.empty += 1;
                    continue;
                }
            };

            let stats = &mut acc.statistics;
            stats.count += 1;
            if self.settings.frequencies {
                *stats.frequencies.entry(value.to_string()).or_insert(0) += 1;
            }
            if self.settings.patterns {
                *stats.patterns.entry(pattern_of(value)).or_insert(0) += 1;
            }

            if !is_valid(value, column.data_type) {
                acc.quality.invalid += 1;
                continue;
            }
            acc.quality.valid += 1;

            if column.data_type.is_numeric() {
                if let Some(number) = parse_number(value) {
                    match stats.numeric.as_mut() {
                        Some(summary) => summary.merge(&NumericSummary::of(number)),
                        None => stats.numeric = Some(NumericSummary::of(number)),
                    }
                }
            }
        }
    }

    /// Combine another accumulator into this one
    pub fn merge(&mut self, other: &StatisticsAccumulator) {
        self.rows += other.rows;
        for (id, acc) in &other.columns {
            self.columns.entry(id.clone()).or_default().merge(acc);
        }
    }

    /// Quality counters of a column, if any row was seen for it
    pub fn quality(&self, column: &str) -> Option<Quality> {
        self.columns.get(column).map(|c| c.quality)
    }

    /// Statistics of a column, if any row was seen for it
    pub fn statistics(&self, column: &str) -> Option<&ColumnStatistics> {
        self.columns.get(column).map(|c| &c.statistics)
    }

    /// Write quality and statistics into every column of `metadata`.
    ///
    /// Columns no row was counted against get zeroed counters.
    pub fn apply_to(&self, metadata: &mut RowMetadata) {
        for column in metadata.columns_mut() {
            match self.columns.get(&column.id) {
                Some(acc) => {
                    column.quality = acc.quality;
                    column.statistics = acc.statistics.clone();
                }
                None => {
                    column.quality = Quality::default();
                    column.statistics = ColumnStatistics::default();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnMetadata, DataType};

    fn metadata() -> RowMetadata {
        RowMetadata::new(vec![
            ColumnMetadata::new("0000", "name", DataType::String),
            ColumnMetadata::new("0001", "age", DataType::Integer),
        ])
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new(1).with("0000", "Ann").with("0001", "31"),
            Row::new(2).with("0000", "Bob").with("0001", "abc"),
            Row::new(3).with("0000", "").with("0001", "12"),
            Row::new(4).with("0000", "Ann"),
        ]
    }

    #[test]
    fn test_quality_counts() {
        let md = metadata();
        let mut acc = StatisticsAccumulator::default();
        for row in rows() {
            acc.accept(&row, &md);
        }

        assert_eq!(acc.rows(), 4);
        let age = acc.quality("0001").unwrap();
        assert_eq!((age.valid, age.invalid, age.empty), (2, 1, 1));
        assert_eq!(age.total(), 4);

        let summary = acc.statistics("0001").unwrap().numeric.unwrap();
        assert_eq!((summary.count, summary.min, summary.max), (2, 12.0, 31.0));
    }

    #[test]
    fn test_deleted_rows_not_counted() {
        let md = metadata();
        let mut acc = StatisticsAccumulator::default();
        let mut row = Row::new(1).with("0000", "x");
        row.set_deleted(true);
        acc.accept(&row, &md);
        assert_eq!(acc.rows(), 0);
        assert!(acc.quality("0000").is_none());
    }

    #[test]
    fn test_frequencies_and_patterns() {
        let md = metadata();
        let mut acc = StatisticsAccumulator::default();
        for row in rows() {
            acc.accept(&row, &md);
        }
        let names = acc.statistics("0000").unwrap();
        assert_eq!(names.frequencies.get("Ann"), Some(&2));
        assert_eq!(names.patterns.get("Aaa"), Some(&3));
        assert_eq!(names.most_frequent(), Some(("Ann", 2)));
    }

    #[test]
    fn test_disabled_tables_stay_empty() {
        let md = metadata();
        let mut acc = StatisticsAccumulator::new(StatisticsSettings {
            frequencies: false,
            patterns: false,
        });
        for row in rows() {
            acc.accept(&row, &md);
        }
        let names = acc.statistics("0000").unwrap();
        assert!(names.frequencies.is_empty());
        assert!(names.patterns.is_empty());
        assert_eq!(names.count, 3);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let md = metadata();
        let all = rows();

        let mut whole = StatisticsAccumulator::default();
        for row in &all {
            whole.accept(row, &md);
        }

        let mut left = StatisticsAccumulator::default();
        let mut right = StatisticsAccumulator::default();
        for row in &all[..1] {
            left.accept(row, &md);
        }
        for row in &all[1..] {
            right.accept(row, &md);
        }
        left.merge(&right);

        assert_eq!(left, whole);
    }

    #[test]
    fn test_apply_to_zeroes_unseen_columns() {
        let mut md = metadata();
        md.push(ColumnMetadata::new("0002", "extra", DataType::String));
        md.columns_mut()[2].quality.valid = 9;

        let mut acc = StatisticsAccumulator::default();
        acc.accept(&Row::new(1).with("0000", "a"), &metadata());
        acc.apply_to(&mut md);

        assert_eq!(md.column("0000").unwrap().quality.valid, 1);
        assert_eq!(md.column("0002").unwrap().quality, Quality::default());
    }
}
