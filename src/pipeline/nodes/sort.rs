//! SortNode: stable sort on one column.

use crate::analysis::validity::parse_number;
use crate::pipeline::packet::{Packet, RowPacket, Signal};
use crate::pipeline::PipelineResult;
use crate::types::ColumnId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort key of a [`SortNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: ColumnId,
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(column: impl Into<ColumnId>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

/// Numbers before text, numbers by value, text lexicographically; missing
/// cells sort as empty text.
fn compare_values(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a.and_then(parse_number), b.and_then(parse_number)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.unwrap_or("").cmp(b.unwrap_or("")),
    }
}

/// Buffers every row and releases them sorted at end-of-stream.
#[derive(Debug, Clone)]
pub struct SortNode {
    spec: SortSpec,
    buffer: Vec<RowPacket>,
    passthrough: Vec<Packet>,
}

impl SortNode {
    pub fn new(spec: SortSpec) -> Self {
        Self {
            spec,
            buffer: Vec::new(),
            passthrough: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        "Sort"
    }

    pub fn spec(&self) -> &SortSpec {
        &self.spec
    }

    pub fn receive(&mut self, packet: Packet, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => self.buffer.push(p),
            other => self.passthrough.push(other),
        }
        Ok(())
    }

    pub fn on_signal(&mut self, signal: Signal, out: &mut Vec<Packet>) -> PipelineResult<()> {
        let mut rows = std::mem::take(&mut self.buffer);
        let passthrough = std::mem::take(&mut self.passthrough);
        if !signal.flushes() {
            return Ok(());
        }

        let column = self.spec.column.as_str();
        rows.sort_by(|a, b| {
            let ord = compare_values(a.row.get(column), b.row.get(column));
            if self.spec.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        out.extend(rows.into_iter().map(Packet::Row));
        out.extend(passthrough);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Row, RowMetadata};
    use std::sync::Arc;

    fn sorted(spec: SortSpec, values: &[&str]) -> Vec<u64> {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let mut node = SortNode::new(spec);
        let mut out = Vec::new();
        for (i, v) in values.iter().enumerate() {
            node.receive(Packet::row(Row::new(i as u64).with("0000", *v), md.clone()), &mut out)
                .unwrap();
        }
        assert!(out.is_empty());
        node.on_signal(Signal::EndOfStream, &mut out).unwrap();
        out.iter().map(|p| p.as_row().unwrap().row.id).collect()
    }

    #[test]
    fn test_numeric_aware_and_stable() {
        let ids = sorted(SortSpec::ascending("0000"), &["10", "b", "9", "a", "9"]);
        assert_eq!(ids, vec![2, 4, 0, 3, 1]);
    }

    #[test]
    fn test_descending_keeps_ties_in_order() {
        let spec = SortSpec {
            column: "0000".into(),
            descending: true,
        };
        let ids = sorted(spec, &["1", "2", "2"]);
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_stop_discards() {
        let md = Arc::new(RowMetadata::from_names(&["a"]));
        let mut node = SortNode::new(SortSpec::ascending("0000"));
        let mut out = Vec::new();
        node.receive(Packet::row(Row::new(1), md), &mut out).unwrap();
        node.on_signal(Signal::Stop, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
