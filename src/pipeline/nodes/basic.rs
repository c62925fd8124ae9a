//! BasicNode: pass-through.

use crate::pipeline::packet::{Packet, Signal};
use crate::pipeline::PipelineResult;

/// Forwards every packet unchanged. Heads the branches of a clone link.
#[derive(Debug, Clone)]
pub struct BasicNode {
    label: String,
}

impl BasicNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn name(&self) -> &str {
        "Basic"
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn receive(&mut self, packet: Packet, out: &mut Vec<Packet>) -> PipelineResult<()> {
        out.push(packet);
        Ok(())
    }

    pub fn on_signal(&mut self, _signal: Signal, _out: &mut Vec<Packet>) -> PipelineResult<()> {
        Ok(())
    }
}
