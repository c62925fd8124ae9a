use crate::pipeline::id::NodeId;

/// Compiled execution plan for a pipeline graph.
/// Contains the nodes reachable from the source, in topological order.
#[derive(Debug, Clone, Default)]
pub struct CompiledPlan {
    /// Reachable nodes in topological order
    pub order: Vec<NodeId>,

    /// Resolved edges (from, to); zip links resolve to their join target
    pub edges: Vec<(NodeId, NodeId)>,

    /// Compilation statistics
    pub stats: PlanStats,

    /// Nodes not reachable from the source; they never run
    pub unreachable_nodes: Vec<NodeId>,

    /// Reachable nodes with no path to a sink
    pub dead_end_nodes: Vec<NodeId>,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Total number of nodes in the graph
    pub total_nodes: usize,

    /// Number of nodes in the execution order
    pub active_nodes: usize,

    /// Number of nodes not reachable from the source
    pub disconnected_nodes: usize,

    /// Number of reachable sink nodes
    pub sink_nodes: usize,

    /// Number of reachable nodes that cannot reach a sink
    pub dead_end_nodes: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

impl CompiledPlan {
    /// Check if the plan has any active nodes
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.order.contains(&id)
    }

    /// Direct successors of `id` in the plan
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(from, _)| *from == id)
            .map(|(_, to)| *to)
    }
}
