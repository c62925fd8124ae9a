use super::compiled_plan::{CompiledPlan, PlanStats};
use super::error::{PipelineError, PipelineResult};
use super::id::NodeId;
use super::link::{Link, ZipJoin};
use super::node::NodeSlot;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Compiles a pipeline graph into an execution plan
pub struct PipelineCompiler;

impl PipelineCompiler {
    /// Compile a pipeline graph into an execution plan.
    ///
    /// Every node reachable from the source is part of the plan, whether or
    /// not it leads to a sink: it still has to receive its terminal signal.
    /// Reachable nodes without a path to a sink are reported as dead ends.
    ///
    /// # Errors
    /// - `InvalidLink` when a link points outside the graph
    /// - `Structural` when a reachable zip join misses one of its sides
    /// - `CycleDetected` when the reachable part of the graph has a cycle
    pub fn compile(
        nodes: &[NodeSlot],
        joins: &[ZipJoin],
        source: NodeId,
    ) -> PipelineResult<CompiledPlan> {
        let start_time = std::time::Instant::now();

        let n = nodes.len();
        if n == 0 {
            return Ok(CompiledPlan::default());
        }
        if source.index() >= n {
            return Err(PipelineError::InvalidLink(format!(
                "source {:?} is not a node of this graph",
                source
            )));
        }

        // Build adjacency lists (forward and backward)
        let (fwd_adj, bwd_adj, join_sides) = Self::build_adjacency(nodes, joins)?;

        // Forward reachability from the source
        let reachable = Self::reachability(&[source.index()], &fwd_adj, n);

        // Backward reachability from sinks
        let sinks: Vec<usize> = (0..n)
            .filter(|&i| reachable[i] && nodes[i].node.kind().is_sink())
            .collect();
        let leads_to_sink = Self::reachability(&sinks, &bwd_adj, n);

        Self::check_joins(joins, &join_sides, &reachable)?;

        let order = Self::topological_sort(&fwd_adj, &reachable);
        let active = reachable.iter().filter(|&&r| r).count();
        if order.len() < active {
            return Err(PipelineError::CycleDetected);
        }

        let dead_end_nodes: Vec<NodeId> = (0..n)
            .filter(|&i| reachable[i] && !leads_to_sink[i])
            .map(|i| NodeId(i as u32))
            .collect();
        for id in &dead_end_nodes {
            warn!(
                "Node {:?} ({}) has no path to a sink",
                id,
                nodes[id.index()].node.name()
            );
        }

        let unreachable_nodes: Vec<NodeId> = (0..n)
            .filter(|&i| !reachable[i])
            .map(|i| NodeId(i as u32))
            .collect();

        let edges = order
            .iter()
            .flat_map(|&from| {
                fwd_adj[from]
                    .iter()
                    .map(move |&to| (NodeId(from as u32), NodeId(to as u32)))
            })
            .collect();

        let stats = PlanStats {
            total_nodes: n,
            active_nodes: order.len(),
            disconnected_nodes: unreachable_nodes.len(),
            sink_nodes: sinks.len(),
            dead_end_nodes: dead_end_nodes.len(),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };
        debug!("Compiled plan: {:?}", stats);

        Ok(CompiledPlan {
            order: order.into_iter().map(|i| NodeId(i as u32)).collect(),
            edges,
            stats,
            unreachable_nodes,
            dead_end_nodes,
        })
    }

    /// Build forward and backward adjacency lists, plus the feeding node of
    /// each join side
    #[allow(clippy::type_complexity)]
    fn build_adjacency(
        nodes: &[NodeSlot],
        joins: &[ZipJoin],
    ) -> PipelineResult<(Vec<Vec<usize>>, Vec<Vec<usize>>, Vec<[Option<usize>; 2]>)> {
        let n = nodes.len();
        let mut fwd_adj = vec![Vec::new(); n];
        let mut bwd_adj = vec![Vec::new(); n];
        let mut join_sides = vec![[None, None]; joins.len()];

        let check = |from: usize, to: NodeId| -> PipelineResult<usize> {
            if to.index() < n {
                Ok(to.index())
            } else {
                Err(PipelineError::InvalidLink(format!(
                    "node {} links to missing node {:?}",
                    from, to
                )))
            }
        };

        for (from, slot) in nodes.iter().enumerate() {
            let targets = match &slot.link {
                None => continue,
                Some(Link::Basic(to)) => vec![check(from, *to)?],
                Some(Link::Clone(targets)) => targets
                    .iter()
                    .map(|to| check(from, *to))
                    .collect::<PipelineResult<Vec<_>>>()?,
                Some(Link::Zip { join, side }) => {
                    let zip = joins.get(join.index()).ok_or_else(|| {
                        PipelineError::InvalidLink(format!(
                            "node {} links to missing join {:?}",
                            from, join
                        ))
                    })?;
                    if *side > 1 {
                        return Err(PipelineError::InvalidLink(format!(
                            "node {} uses side {} of a two-sided join",
                            from, side
                        )));
                    }
                    if join_sides[join.index()][*side].replace(from).is_some() {
                        return Err(PipelineError::InvalidLink(format!(
                            "side {} of join {:?} is fed twice",
                            side, join
                        )));
                    }
                    vec![check(from, zip.target())?]
                }
            };
            for to in targets {
                fwd_adj[from].push(to);
                bwd_adj[to].push(from);
            }
        }

        Ok((fwd_adj, bwd_adj, join_sides))
    }

    /// Nodes reachable from `starts` along `adj` (DFS)
    fn reachability(starts: &[usize], adj: &[Vec<usize>], n: usize) -> Vec<bool> {
        let mut reachable = vec![false; n];
        let mut stack = Vec::new();

        for &start in starts {
            reachable[start] = true;
            stack.push(start);
        }

        while let Some(node) = stack.pop() {
            for &neighbor in &adj[node] {
                if !reachable[neighbor] {
                    reachable[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }

        reachable
    }

    /// A reachable join must be fed from both sides, both reachable, or its
    /// end-of-stream never arrives
    fn check_joins(
        joins: &[ZipJoin],
        join_sides: &[[Option<usize>; 2]],
        reachable: &[bool],
    ) -> PipelineResult<()> {
        for (join, sides) in joins.iter().zip(join_sides) {
            let fed = sides.iter().filter(|s| s.is_some_and(|i| reachable[i])).count();
            if fed == 1 {
                return Err(PipelineError::structural(
                    join.target(),
                    "zip join is fed by only one reachable side",
                ));
            }
        }
        Ok(())
    }

    /// Topological sort of reachable nodes using Kahn's algorithm
    fn topological_sort(fwd_adj: &[Vec<usize>], reachable: &[bool]) -> Vec<usize> {
        let n = fwd_adj.len();
        let mut in_degree = vec![0usize; n];

        for from in (0..n).filter(|&i| reachable[i]) {
            for &to in &fwd_adj[from] {
                in_degree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> =
            (0..n).filter(|&i| reachable[i] && in_degree[i] == 0).collect();
        let mut result = Vec::new();

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbor in &fwd_adj[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }
}
