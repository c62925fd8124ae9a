//! LimitNode: keeps the first N rows.

use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;

/// Passes rows until `limit` non-deleted rows went through, then drops the
/// rest. Deleted rows travelling before saturation pass along with them.
#[derive(Debug, Clone)]
pub struct LimitNode {
    limit: u64,
    passed: u64,
    dropped: u64,
}

impl LimitNode {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            passed: 0,
            dropped: 0,
        }
    }

    pub fn name(&self) -> &str {
        "Limit"
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_saturated(&self) -> bool {
        self.passed >= self.limit
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        match packet {
            Packet::Row(p) => {
                if self.is_saturated() {
                    self.dropped += 1;
                    return Ok(());
                }
                if !p.row.is_deleted() {
                    self.passed += 1;
                }
                out.push(Packet::Row(p));
            }
            other => out.push(other),
        }
        Ok(())
    }

    pub fn on_signal(&mut self, _signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        Ok(())
    }
}
