//! Row sources.
//!
//! A [`RowSource`] yields rows once, in order, together with the schema
//! they conform to. [`VecSource`] serves in-memory rows;
//! [`JsonLinesSource`] reads one JSON object per line.

use crate::types::{Row, RowMetadata, ROW_ID_KEY};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::io::{self, BufRead};

/// Single-pass sequence of rows.
pub trait RowSource: Send {
    /// Schema of the rows
    fn metadata(&self) -> &RowMetadata;

    /// Next row, `None` once exhausted
    fn next_row(&mut self) -> Option<io::Result<Row>>;
}

/// Rows held in memory.
#[derive(Debug, Clone)]
pub struct VecSource {
    metadata: RowMetadata,
    rows: std::vec::IntoIter<Row>,
}

impl VecSource {
    pub fn new(metadata: RowMetadata, rows: Vec<Row>) -> Self {
        Self {
            metadata,
            rows: rows.into_iter(),
        }
    }

    /// Build string columns from names and rows of values in column order.
    /// Row ids start at 1.
    pub fn from_values<S: AsRef<str>>(names: &[S], values: &[Vec<&str>]) -> Self {
        let metadata = RowMetadata::from_names(names);
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, cells)| {
                metadata
                    .ids()
                    .zip(cells)
                    .fold(Row::new(i as u64 + 1), |row, (id, value)| {
                        row.with(id, *value)
                    })
            })
            .collect();
        Self::new(metadata, rows)
    }
}

impl RowSource for VecSource {
    fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> Option<io::Result<Row>> {
        self.rows.next().map(Ok)
    }
}

/// JSON object with its keys in document order.
struct OrderedObject(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for OrderedObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = OrderedObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<OrderedObject, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(OrderedObject(entries))
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Reads one JSON object per line, keyed by column id or column name.
///
/// Blank lines are skipped. Row ids come from the `tdp_id` key when present,
/// otherwise from the 1-based line count of non-blank lines. String values
/// are kept verbatim, numbers and booleans rendered as text, `null` left
/// empty.
pub struct JsonLinesSource<R> {
    reader: R,
    metadata: RowMetadata,
    pending: Option<OrderedObject>,
    line: u64,
    count: u64,
}

impl<R: BufRead + Send> JsonLinesSource<R> {
    /// Source over a known schema
    pub fn new(reader: R, metadata: RowMetadata) -> Self {
        Self {
            reader,
            metadata,
            pending: None,
            line: 0,
            count: 0,
        }
    }

    /// Source whose schema is inferred from the keys of the first object,
    /// in document order. All inferred columns are strings.
    pub fn infer(reader: R) -> io::Result<Self> {
        let mut source = Self::new(reader, RowMetadata::default());
        if let Some(first) = source.read_object()? {
            let names: Vec<&str> = first
                .0
                .iter()
                .map(|(k, _)| k.as_str())
                .filter(|k| *k != ROW_ID_KEY)
                .collect();
            source.metadata = RowMetadata::from_names(&names);
            source.pending = Some(first);
        }
        Ok(source)
    }

    fn read_object(&mut self) -> io::Result<Option<OrderedObject>> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if buf.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&buf)
                .map(Some)
                .map_err(|e| invalid_data(format!("line {}: {}", self.line, e)));
        }
    }

    fn to_row(&self, object: OrderedObject) -> io::Result<Row> {
        let mut row = Row::new(self.count);
        for (key, value) in object.0 {
            if key == ROW_ID_KEY {
                row.id = value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .ok_or_else(|| {
                        invalid_data(format!("line {}: invalid {}", self.line, ROW_ID_KEY))
                    })?;
                continue;
            }
            let id = if self.metadata.contains(&key) {
                key
            } else if let Some(column) = self.metadata.column_by_name(&key) {
                column.id.clone()
            } else {
                return Err(invalid_data(format!(
                    "line {}: unknown column '{}'",
                    self.line, key
                )));
            };
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(invalid_data(format!(
                        "line {}: column '{}' holds a nested value",
                        self.line, id
                    )))
                }
            };
            row.set(id, text);
        }
        Ok(row)
    }
}

impl<R: BufRead + Send> RowSource for JsonLinesSource<R> {
    fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    fn next_row(&mut self) -> Option<io::Result<Row>> {
        let object = match self.pending.take() {
            Some(object) => object,
            None => match self.read_object() {
                Ok(Some(object)) => object,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            },
        };
        self.count += 1;
        Some(self.to_row(object))
    }
}

/// Drain a source into memory
pub fn read_all(source: &mut dyn RowSource) -> io::Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = source.next_row() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_vec_source_from_values() {
        let mut source = VecSource::from_values(&["a", "b"], &[vec!["1", "2"], vec!["3"]]);
        let rows = read_all(&mut source).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].get("0001"), Some("2"));
        assert!(!rows[1].contains("0001"));
    }

    #[test]
    fn test_infer_keeps_document_order() {
        let input = "{\"name\":\"Ann\",\"age\":31,\"active\":true}\n\n{\"name\":\"Bob\",\"age\":null}\n";
        let mut source = JsonLinesSource::infer(Cursor::new(input)).unwrap();

        let names: Vec<&str> = source
            .metadata()
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["name", "age", "active"]);

        let rows = read_all(&mut source).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("0001"), Some("31"));
        assert_eq!(rows[0].get("0002"), Some("true"));
        assert_eq!(rows[1].id, 2);
        assert!(!rows[1].contains("0001"));
    }

    #[test]
    fn test_keys_by_id_and_explicit_row_id() {
        let metadata = RowMetadata::from_names(&["name"]);
        let input = "{\"tdp_id\":10,\"0000\":\"x\"}\n";
        let mut source = JsonLinesSource::new(Cursor::new(input), metadata);
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.id, 10);
        assert_eq!(row.get("0000"), Some("x"));
    }

    #[test]
    fn test_unknown_column_is_invalid_data() {
        let metadata = RowMetadata::from_names(&["name"]);
        let mut source = JsonLinesSource::new(Cursor::new("{\"city\":\"x\"}\n"), metadata);
        let err = source.next_row().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_malformed_line() {
        let mut source = JsonLinesSource::new(Cursor::new("{oops\n"), RowMetadata::default());
        assert!(source.next_row().unwrap().is_err());
    }
}
