//! Node-based transformation pipeline.
//!
//! Rows flow through typed nodes: Source → actions and their auxiliary
//! nodes → Sink. A terminal signal follows the rows through the same graph
//! so that buffering nodes can flush or discard before they close.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Limit] ──► [InvalidDetection] ──► [Action] ──► … ──► [Statistics] ──► [Collector]
//!                                    │
//!                                    └─ clone ─► [Basic] ──► reference chain ─┐
//!                                             └► [Basic] ──► preview chain ───┴─ zip ─► [Diff]
//! ```
//!
//! # Design
//!
//! - **Enum dispatch**: `Node` enum for all node kinds, one struct each.
//! - **Owned rows, shared schemas**: rows move between nodes by value,
//!   metadata travels as `Arc<RowMetadata>` and is never edited in place.
//! - **Compile once**: actions are compiled while the graph is built; the
//!   compiler only orders nodes and checks the graph.
//! - **Swappable runtimes**: sequential and batch runtimes behind the
//!   `Runtime` trait, picked from configuration.

pub mod bridge;
pub mod builder;
pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod id;
pub mod link;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod packet;
pub mod report;
pub mod runtime;
pub mod visit;

pub use bridge::{ExecutionHandle, Finished};
pub use builder::{BuildOptions, DiffOptions, PipelineBuilder, SinkSpec};
pub use compiled_plan::{CompiledPlan, PlanStats};
pub use compiler::PipelineCompiler;
pub use error::{PipelineError, PipelineResult};
pub use graph::Pipeline;
pub use id::{JoinId, NodeId};
pub use link::{Link, ZipJoin};
pub use node::{Node, NodeSlot, NodeState, Parallelism};
pub use node_type::NodeKind;
pub use nodes::SortSpec;
pub use packet::{Packet, RowPacket, Signal};
pub use report::{ActionReport, Branch, ExecutionFailure, ExecutionReport, Outcome};
pub use runtime::{runtime_for, BatchRuntime, CancelToken, Runtime, SequentialRuntime};
