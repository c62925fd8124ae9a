//! Analysis module for column values
//!
//! This module provides the value-level analysis used by the pipeline:
//! - Validity predicates per [`DataType`](crate::types::DataType)
//! - Value patterns (`Ann-12` → `Aaa-99`)
//! - Mergeable per-column statistics accumulators

pub mod statistics;
pub mod validity;

pub use statistics::{ColumnStatistics, NumericSummary, StatisticsAccumulator};
pub use validity::{is_valid, pattern_of};
