//! Row writers.
//!
//! A [`RowWriter`] is opened lazily by the writer node on the first row (or
//! at end-of-stream for an empty run), receives every output row, and is
//! either closed at end-of-stream or aborted on stop, cancel, error or drop.

use crate::types::{Row, RowMetadata};
use std::io::{self, Write};

/// Output boundary of a pipeline.
pub trait RowWriter: Send {
    fn open(&mut self, metadata: &RowMetadata) -> io::Result<()>;
    fn write(&mut self, row: &Row, metadata: &RowMetadata) -> io::Result<()>;
    /// Flush and release the output
    fn close(&mut self, metadata: &RowMetadata) -> io::Result<()>;
    /// Release the output without completing it
    fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Open,
    Closed,
    Aborted,
}

/// Writes rows as JSON objects, one per line, in schema order with the row
/// id first.
pub struct JsonLinesWriter<W> {
    out: W,
    state: WriterState,
    rows_written: u64,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: WriterState::Idle,
            rows_written: 0,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RowWriter for JsonLinesWriter<W> {
    fn open(&mut self, _metadata: &RowMetadata) -> io::Result<()> {
        if self.state != WriterState::Idle {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("writer cannot be opened in state {:?}", self.state),
            ));
        }
        self.state = WriterState::Open;
        Ok(())
    }

    fn write(&mut self, row: &Row, metadata: &RowMetadata) -> io::Result<()> {
        if self.state != WriterState::Open {
            return Err(io::Error::new(io::ErrorKind::Other, "writer is not open"));
        }
        serde_json::to_writer(&mut self.out, &row.view(metadata))?;
        self.out.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    fn close(&mut self, _metadata: &RowMetadata) -> io::Result<()> {
        if self.state == WriterState::Open {
            self.out.flush()?;
            self.state = WriterState::Closed;
        }
        Ok(())
    }

    fn abort(&mut self) {
        if matches!(self.state, WriterState::Idle | WriterState::Open) {
            let _ = self.out.flush();
            self.state = WriterState::Aborted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    #[test]
    fn test_writes_schema_order() {
        let metadata = RowMetadata::from_names(&["name", "age"]);
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.open(&metadata).unwrap();
        writer
            .write(&Row::new(1).with("0001", "31").with("0000", "Ann"), &metadata)
            .unwrap();
        writer.write(&Row::new(2), &metadata).unwrap();
        writer.close(&metadata).unwrap();

        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(writer.rows_written(), 2);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "{\"tdp_id\":1,\"0000\":\"Ann\",\"0001\":\"31\"}\n{\"tdp_id\":2,\"0000\":\"\",\"0001\":\"\"}\n"
        );
    }

    #[test]
    fn test_write_requires_open() {
        let metadata = RowMetadata::from_names(&["a"]);
        let mut writer = JsonLinesWriter::new(Vec::new());
        assert!(writer.write(&Row::new(1), &metadata).is_err());
        writer.abort();
        assert_eq!(writer.state(), WriterState::Aborted);
        assert!(writer.open(&metadata).is_err());
    }

    #[test]
    fn test_writes_to_file() {
        let metadata = RowMetadata::from_names(&["a"]);
        let mut file = tempfile::tempfile().unwrap();
        {
            let mut writer = JsonLinesWriter::new(&mut file);
            writer.open(&metadata).unwrap();
            writer.write(&Row::new(5).with("0000", "x"), &metadata).unwrap();
            writer.close(&metadata).unwrap();
        }
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "{\"tdp_id\":5,\"0000\":\"x\"}\n");
    }
}
