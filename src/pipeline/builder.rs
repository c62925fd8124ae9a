//! Assembles a pipeline graph from an action list.
//!
//! Layout, always built in this order:
//!
//! ```text
//! Source → [Limit] → [InvalidDetection] → chain(steps) → [Sort]
//!        → [InvalidDetection] → [Statistics] → Sink
//! ```
//!
//! Each step of the chain is compiled against the schema left by the
//! previous one and surrounded by the auxiliary nodes its behaviors ask
//! for. In diff mode the chain is replaced by a reference and a preview
//! branch zipped into a `Diff` node.

use crate::action::{Action, ActionRegistry, ActionStep};
use crate::cache::{CacheKey, MetadataCache};
use crate::config::{PipelineSettings, StatisticsSettings};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::graph::Pipeline;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::Node;
use crate::pipeline::nodes::{
    ActionNode, BasicNode, CollectorNode, DiffNode, EnforceNode, InvalidDetectionNode, LimitNode,
    SortNode, SortSpec, SourceNode, StatisticsMode, StatisticsNode, WriterNode,
};
use crate::pipeline::report::Branch;
use crate::types::RowMetadata;
use crate::writer::RowWriter;
use std::sync::Arc;
use tracing::{debug, info};

/// Diff mode: compare the output of the first `reference_steps` steps with
/// the output of all steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub reference_steps: usize,
}

/// Options of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
    pub diff: Option<DiffOptions>,
    pub detect_invalid: bool,
    pub compute_statistics: bool,
    pub statistics: StatisticsSettings,
    /// Deliver deleted rows to the sink
    pub keep_deleted: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl BuildOptions {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            limit: settings.limit,
            sort: None,
            diff: None,
            detect_invalid: settings.detect_invalid,
            compute_statistics: settings.compute_statistics,
            statistics: settings.statistics.clone(),
            keep_deleted: false,
        }
    }
}

/// Where output rows go.
pub enum SinkSpec {
    /// Keep rows in memory, see [`Pipeline::take_collected`]
    Collector,
    /// Stream rows to a writer, optionally caching the final metadata
    Writer {
        writer: Box<dyn RowWriter>,
        cache: Option<(Arc<dyn MetadataCache>, CacheKey)>,
    },
}

impl std::fmt::Debug for SinkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkSpec::Collector => write!(f, "Collector"),
            SinkSpec::Writer { cache, .. } => f
                .debug_struct("Writer")
                .field("cache", &cache.as_ref().map(|(_, key)| key.to_string()))
                .finish(),
        }
    }
}

/// Builds pipelines against an injected action registry.
pub struct PipelineBuilder<'a> {
    registry: &'a ActionRegistry,
    options: BuildOptions,
}

/// Tail of the graph under construction
struct Cursor {
    tail: NodeId,
    schema: RowMetadata,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(registry: &'a ActionRegistry) -> Self {
        Self {
            registry,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the graph for `steps` over rows of `schema`.
    ///
    /// # Errors
    /// `UnknownAction` when a step names an action the registry doesn't
    /// know. Compile failures of known actions are not errors; the action
    /// is reported as not executed.
    pub fn build(
        &self,
        steps: &[ActionStep],
        schema: RowMetadata,
        sink: SinkSpec,
    ) -> PipelineResult<Pipeline> {
        let actions = steps
            .iter()
            .map(|step| self.registry.resolve(&step.action))
            .collect::<PipelineResult<Vec<_>>>()?;

        let source_schema = Arc::new(schema);
        let mut pipeline = Pipeline::new(source_schema.clone());
        let source = pipeline.add_node(Node::Source(SourceNode::new(source_schema.clone())));
        pipeline.set_source(source)?;

        let mut cursor = Cursor {
            tail: source,
            schema: (*source_schema).clone(),
        };

        if let Some(limit) = self.options.limit {
            self.append(&mut pipeline, &mut cursor, Node::Limit(LimitNode::new(limit)))?;
        }
        if self.options.detect_invalid {
            self.append_invalid_detection(&mut pipeline, &mut cursor)?;
        }

        match self.options.diff {
            None => self.chain(&mut pipeline, &mut cursor, &actions, steps, 0, Branch::Main)?,
            Some(diff) => self.diff(&mut pipeline, &mut cursor, &actions, steps, diff)?,
        }

        if let Some(spec) = &self.options.sort {
            self.append(&mut pipeline, &mut cursor, Node::Sort(SortNode::new(spec.clone())))?;
        }
        if self.options.detect_invalid {
            self.append_invalid_detection(&mut pipeline, &mut cursor)?;
        }

        let output_schema = Arc::new(cursor.schema.clone());
        if self.options.compute_statistics {
            let node = StatisticsNode::new(
                StatisticsMode::Streaming,
                self.options.statistics.clone(),
                output_schema.clone(),
            );
            self.append(&mut pipeline, &mut cursor, Node::Statistics(node))?;
        }

        let sink = match sink {
            SinkSpec::Collector => {
                Node::Collector(CollectorNode::new(output_schema, self.options.keep_deleted))
            }
            SinkSpec::Writer { writer, cache } => Node::Writer(WriterNode::new(
                writer,
                cache,
                output_schema,
                self.options.keep_deleted,
            )),
        };
        self.append(&mut pipeline, &mut cursor, sink)?;

        let skipped = pipeline
            .action_reports()
            .iter()
            .filter(|r| !r.compiled)
            .count();
        info!(
            "Built pipeline: {} nodes, {} actions ({} skipped)",
            pipeline.len(),
            steps.len(),
            skipped
        );
        Ok(pipeline)
    }

    fn append(&self, pipeline: &mut Pipeline, cursor: &mut Cursor, node: Node) -> PipelineResult<()> {
        let id = pipeline.add_node(node);
        pipeline.connect(cursor.tail, id)?;
        cursor.tail = id;
        Ok(())
    }

    fn append_invalid_detection(
        &self,
        pipeline: &mut Pipeline,
        cursor: &mut Cursor,
    ) -> PipelineResult<()> {
        if matches!(pipeline.node(cursor.tail), Some(Node::InvalidDetection(_))) {
            return Ok(());
        }
        self.append(
            pipeline,
            cursor,
            Node::InvalidDetection(InvalidDetectionNode::new()),
        )
    }

    /// Append one action node per step, with its auxiliary nodes
    fn chain(
        &self,
        pipeline: &mut Pipeline,
        cursor: &mut Cursor,
        actions: &[Arc<dyn Action>],
        steps: &[ActionStep],
        first_index: usize,
        branch: Branch,
    ) -> PipelineResult<()> {
        for (offset, (action, step)) in actions.iter().zip(steps).enumerate() {
            let index = first_index + offset;
            let (node, output) = ActionNode::compile(
                index,
                branch,
                action.clone(),
                step.parameters.clone(),
                &cursor.schema,
            );

            if !node.status().is_compiled() {
                self.append(pipeline, cursor, Node::Action(node))?;
                continue;
            }

            let behavior = action.behavior();
            if behavior.needs_invalid_flags() || behavior.needs_statistics() {
                self.append_invalid_detection(pipeline, cursor)?;
            }
            if behavior.needs_statistics() {
                let stats = StatisticsNode::new(
                    StatisticsMode::Blocking,
                    self.options.statistics.clone(),
                    Arc::new(cursor.schema.clone()),
                );
                self.append(pipeline, cursor, Node::Statistics(stats))?;
            }

            self.append(pipeline, cursor, Node::Action(node))?;
            cursor.schema = output;

            if behavior.changes_columns() {
                self.append(pipeline, cursor, Node::Enforce(EnforceNode::new()))?;
            }
            if behavior.changes_type() {
                self.append_invalid_detection(pipeline, cursor)?;
            }
            debug!("Step #{} '{}' [{}] chained", index, step.action, branch.name());
        }
        Ok(())
    }

    /// Reference and preview branches zipped into a diff node
    fn diff(
        &self,
        pipeline: &mut Pipeline,
        cursor: &mut Cursor,
        actions: &[Arc<dyn Action>],
        steps: &[ActionStep],
        options: DiffOptions,
    ) -> PipelineResult<()> {
        let k = options.reference_steps.min(steps.len());

        let reference_head = pipeline.add_node(Node::Basic(BasicNode::new("reference")));
        let preview_head = pipeline.add_node(Node::Basic(BasicNode::new("preview")));
        pipeline.clone_to(cursor.tail, vec![reference_head, preview_head])?;

        let mut reference = Cursor {
            tail: reference_head,
            schema: cursor.schema.clone(),
        };
        self.chain(
            pipeline,
            &mut reference,
            &actions[..k],
            &steps[..k],
            0,
            Branch::Reference,
        )?;

        let mut preview = Cursor {
            tail: preview_head,
            schema: cursor.schema.clone(),
        };
        self.chain(pipeline, &mut preview, actions, steps, 0, Branch::Preview)?;

        let diff = pipeline.add_node(Node::Diff(DiffNode::new()));
        pipeline.zip(reference.tail, preview.tail, diff)?;

        cursor.tail = diff;
        cursor.schema = preview.schema;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Parameters;
    use crate::pipeline::node_type::NodeKind;
    use crate::pipeline::PipelineError;
    use crate::types::DataType;

    macro_rules! node_kinds {
        ($($kind:ident),* $(,)?) => {
            vec![$(NodeKind::$kind),*]
        };
    }

    fn schema() -> RowMetadata {
        RowMetadata::from_names(&["name", "age"])
    }

    fn kinds(pipeline: &Pipeline) -> Vec<NodeKind> {
        pipeline.nodes().iter().map(|s| s.node().kind()).collect()
    }

    fn plain() -> BuildOptions {
        BuildOptions {
            detect_invalid: false,
            compute_statistics: false,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_default_layout() {
        let registry = ActionRegistry::builtin();
        let steps = vec![ActionStep::new(
            "uppercase",
            Parameters::new().with("column_id", "0000"),
        )];
        let p = PipelineBuilder::new(&registry)
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap();
        assert_eq!(
            kinds(&p),
            node_kinds![
                Source,
                InvalidDetection,
                Action,
                InvalidDetection,
                Statistics,
                Collector
            ]
        );
    }

    #[test]
    fn test_auxiliary_nodes() {
        let registry = ActionRegistry::builtin();
        let steps = vec![
            ActionStep::new(
                "type_change",
                Parameters::new()
                    .with("column_id", "0001")
                    .with("new_type", "integer"),
            ),
            ActionStep::new("delete_all_empty_columns", Parameters::new()),
            ActionStep::new("copy", Parameters::new().with("column_id", "0000")),
        ];
        let p = PipelineBuilder::new(&registry)
            .with_options(plain())
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap();
        assert_eq!(
            kinds(&p),
            node_kinds![
                Source,
                Action,
                InvalidDetection,
                Statistics,
                Action,
                Enforce,
                Action,
                Enforce,
                Collector
            ]
        );
    }

    #[test]
    fn test_skipped_step_has_no_auxiliary_nodes() {
        let registry = ActionRegistry::builtin();
        let steps = vec![ActionStep::new(
            "copy",
            Parameters::new().with("column_id", "9999"),
        )];
        let p = PipelineBuilder::new(&registry)
            .with_options(plain())
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap();
        assert_eq!(kinds(&p), node_kinds![Source, Action, Collector]);
        let reports = p.action_reports();
        assert!(!reports[0].compiled);
        assert!(reports[0].skip_reason.as_deref().unwrap().contains("9999"));
    }

    #[test]
    fn test_unknown_action_fails_the_build() {
        let registry = ActionRegistry::builtin();
        let steps = vec![ActionStep::new("no_such_action", Parameters::new())];
        let err = PipelineBuilder::new(&registry)
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownAction(name) if name == "no_such_action"));
    }

    #[test]
    fn test_schema_flows_through_the_chain() {
        let registry = ActionRegistry::builtin();
        let steps = vec![
            ActionStep::new(
                "type_change",
                Parameters::new()
                    .with("column_id", "0001")
                    .with("new_type", "integer"),
            ),
            // Only accepted on string columns, so this one is skipped
            ActionStep::new("uppercase", Parameters::new().with("column_id", "0001")),
        ];
        let mut p = PipelineBuilder::new(&registry)
            .with_options(plain())
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap();
        let reports = p.action_reports();
        assert!(reports[0].compiled);
        assert!(!reports[1].compiled);

        let (_, md) = p.take_collected().unwrap();
        assert_eq!(md.column("0001").unwrap().data_type, DataType::Integer);
    }

    #[test]
    fn test_diff_layout() {
        let registry = ActionRegistry::builtin();
        let steps = vec![
            ActionStep::new("uppercase", Parameters::new().with("column_id", "0000")),
            ActionStep::new("lowercase", Parameters::new().with("column_id", "0000")),
        ];
        let p = PipelineBuilder::new(&registry)
            .with_options(BuildOptions {
                diff: Some(DiffOptions { reference_steps: 1 }),
                ..plain()
            })
            .build(&steps, schema(), SinkSpec::Collector)
            .unwrap();
        assert_eq!(
            kinds(&p),
            node_kinds![Source, Basic, Basic, Action, Action, Action, Diff, Collector]
        );
        let branches: Vec<Branch> = p.action_reports().iter().map(|r| r.branch).collect();
        assert_eq!(
            branches,
            vec![Branch::Reference, Branch::Preview, Branch::Preview]
        );
        assert_eq!(p.joins().len(), 1);
    }
}
