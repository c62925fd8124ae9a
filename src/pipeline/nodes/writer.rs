//! WriterNode: streams output rows to a [`RowWriter`].
//!
//! The writer is opened on the first row or on end-of-stream, whichever
//! comes first, so an empty run still produces a well-formed output. On
//! end-of-stream the writer is closed and the final metadata is stored in
//! the metadata cache when one is configured. Stop and cancel abort the
//! writer; so does dropping a node that never finished.

use super::check_row_columns;
use crate::cache::{write_metadata, CacheKey, MetadataCache};
use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;
use crate::types::RowMetadata;
use crate::writer::RowWriter;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct WriterNode {
    writer: Box<dyn RowWriter>,
    cache: Option<(Arc<dyn MetadataCache>, CacheKey)>,
    opened: bool,
    finished: bool,
    metadata: Option<Arc<RowMetadata>>,
    fallback: Arc<RowMetadata>,
    keep_deleted: bool,
    rows_written: u64,
}

impl WriterNode {
    pub fn new(
        writer: Box<dyn RowWriter>,
        cache: Option<(Arc<dyn MetadataCache>, CacheKey)>,
        fallback: Arc<RowMetadata>,
        keep_deleted: bool,
    ) -> Self {
        Self {
            writer,
            cache,
            opened: false,
            finished: false,
            metadata: None,
            fallback,
            keep_deleted,
            rows_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        "Writer"
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn metadata(&self) -> &Arc<RowMetadata> {
        self.metadata.as_ref().unwrap_or(&self.fallback)
    }

    fn ensure_open(&mut self, metadata: &RowMetadata) -> PipelineResult<()> {
        if !self.opened {
            self.writer.open(metadata)?;
            self.opened = true;
        }
        Ok(())
    }

    pub fn receive(&mut self, packet: Packet, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => {
                check_row_columns(&p.row, &p.metadata)?;
                if self.keep_deleted || !p.row.is_deleted() {
                    self.ensure_open(&p.metadata)?;
                    self.writer.write(&p.row, &p.metadata)?;
                    self.rows_written += 1;
                }
                self.metadata = Some(p.metadata);
            }
            Packet::Metadata(metadata) => self.metadata = Some(metadata),
            Packet::Zipped(pair) => {
                warn!("Writer ignores a zipped packet of {} rows", pair.len());
            }
            Packet::Signal(_) => {}
        }
        Ok(())
    }

    pub fn on_signal(&mut self, signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        if self.finished {
            return Ok(());
        }
        if !signal.flushes() {
            debug!("Writer aborted on {}", signal);
            self.writer.abort();
            self.finished = true;
            return Ok(());
        }

        let metadata = self.metadata().clone();
        if let Err(e) = self
            .ensure_open(&metadata)
            .and_then(|_| Ok(self.writer.close(&metadata)?))
        {
            self.writer.abort();
            self.finished = true;
            return Err(e);
        }
        self.finished = true;

        if let Some((cache, key)) = &self.cache {
            write_metadata(cache.as_ref(), key, &metadata)?;
            debug!("Stored metadata under {}", key);
        }
        Ok(())
    }
}

impl Drop for WriterNode {
    fn drop(&mut self) {
        if !self.finished {
            self.writer.abort();
        }
    }
}

impl std::fmt::Debug for WriterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterNode")
            .field("opened", &self.opened)
            .field("finished", &self.finished)
            .field("rows_written", &self.rows_written)
            .field("cache", &self.cache.as_ref().map(|(_, key)| key.to_string()))
            .finish()
    }
}
