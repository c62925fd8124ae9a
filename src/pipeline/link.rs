//! Links between nodes.
//!
//! A node has at most one outgoing link:
//! - `Basic(to)` forwards every packet 1:1
//! - `Clone(targets)` deep-copies every packet per target; the last target
//!   gets the original
//! - `Zip { join, side }` feeds one side of a two-input [`ZipJoin`]

use crate::pipeline::id::{JoinId, NodeId};
use crate::pipeline::packet::{Packet, RowPacket, Signal};
use std::collections::VecDeque;
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Basic(NodeId),
    Clone(Vec<NodeId>),
    Zip { join: JoinId, side: usize },
}

impl Link {
    /// Nodes this link delivers to directly; a zip link delivers through its
    /// join and reports nothing here.
    pub fn targets(&self) -> &[NodeId] {
        match self {
            Link::Basic(to) => std::slice::from_ref(to),
            Link::Clone(targets) => targets,
            Link::Zip { .. } => &[],
        }
    }
}

/// Pairs rows from two sides by position.
///
/// Side 0 is the reference side, side 1 the preview side. Each pair goes
/// out as one `Zipped` packet, reference first. Rows left unmatched when
/// both sides have ended are dropped with a warning.
#[derive(Debug, Clone)]
pub struct ZipJoin {
    target: NodeId,
    pending: [VecDeque<RowPacket>; 2],
    ended: [bool; 2],
    forwarded: Option<Signal>,
}

impl ZipJoin {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            pending: [VecDeque::new(), VecDeque::new()],
            ended: [false, false],
            forwarded: None,
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Signal already forwarded to the target, if any
    pub fn forwarded(&self) -> Option<Signal> {
        self.forwarded
    }

    /// Same target, empty state
    pub fn reset(&self) -> Self {
        Self::new(self.target)
    }

    /// Feed a packet from `side`; returns what to deliver to the target.
    pub fn push(&mut self, side: usize, packet: Packet) -> Vec<Packet> {
        let side = side.min(1);
        if self.forwarded.is_some() {
            trace!("Zip join to {:?} already closed, packet dropped", self.target);
            return Vec::new();
        }
        match packet {
            Packet::Row(row) => {
                self.pending[side].push_back(row);
                self.drain_pairs()
            }
            Packet::Signal(Signal::EndOfStream) => {
                self.ended[side] = true;
                if self.ended[0] && self.ended[1] {
                    let leftovers = self.pending[0].len() + self.pending[1].len();
                    if leftovers > 0 {
                        warn!(
                            "Zip join to {:?} dropped {} unmatched rows (reference {}, preview {})",
                            self.target,
                            leftovers,
                            self.pending[0].len(),
                            self.pending[1].len()
                        );
                        self.pending[0].clear();
                        self.pending[1].clear();
                    }
                    self.forwarded = Some(Signal::EndOfStream);
                    vec![Packet::Signal(Signal::EndOfStream)]
                } else {
                    Vec::new()
                }
            }
            Packet::Signal(signal) => {
                self.pending[0].clear();
                self.pending[1].clear();
                self.forwarded = Some(signal);
                vec![Packet::Signal(signal)]
            }
            Packet::Metadata(_) | Packet::Zipped(_) => {
                trace!("Zip join to {:?} ignores non-row packet", self.target);
                Vec::new()
            }
        }
    }

    fn drain_pairs(&mut self) -> Vec<Packet> {
        let mut out = Vec::new();
        while !self.pending[0].is_empty() && !self.pending[1].is_empty() {
            if let (Some(left), Some(right)) =
                (self.pending[0].pop_front(), self.pending[1].pop_front())
            {
                out.push(Packet::Zipped(vec![left, right]));
            }
        }
        out
    }
}
