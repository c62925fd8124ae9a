//! dataprep - command line front end of the pipeline engine
//!
//! Runs an action list over JSON-lines rows, prints the graph built for an
//! action list, or lists the registered actions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dataprep_rs::{
    action::{parse_steps, ActionRegistry, ActionStep},
    cache::{read_metadata, CacheKey, InMemoryCache, MetadataCache},
    config::{EngineConfig, LoggingSettings, RuntimeKind},
    pipeline::{
        runtime_for, visit, BuildOptions, CancelToken, DiffOptions, PipelineBuilder, SinkSpec,
        SortSpec,
    },
    source::{JsonLinesSource, RowSource},
    types::RowMetadata,
    writer::JsonLinesWriter,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dataprep", version, about = "Row transformation pipeline engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config file (default: platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an action list over JSON-lines rows
    Run {
        /// Action list JSON file
        #[arg(short, long)]
        actions: PathBuf,

        /// JSON-lines input, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Schema JSON file (default: inferred from the first row)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// JSON-lines output, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the final metadata JSON to this file
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Runtime override (sequential, batch)
        #[arg(short, long)]
        runtime: Option<RuntimeKind>,

        /// Only process the first N rows
        #[arg(short, long)]
        limit: Option<u64>,

        /// Sort the output on this column id
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        descending: bool,

        /// Diff mode: compare the first N actions with all actions
        #[arg(long)]
        diff: Option<usize>,

        /// Also write deleted rows
        #[arg(long)]
        keep_deleted: bool,
    },

    /// Print the graph built for an action list
    Dump {
        /// Action list JSON file
        #[arg(short, long)]
        actions: PathBuf,

        /// Schema JSON file
        #[arg(short, long, conflicts_with = "input")]
        schema: Option<PathBuf>,

        /// JSON-lines file to infer the schema from
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List registered actions
    Actions,
}

/// Initialise tracing; the returned guard flushes the log file on drop
fn init_logging(
    settings: &LoggingSettings,
    verbose: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = if verbose { "debug" } else { settings.filter.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .context("Failed to create env filter")?;

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .with_context(|| format!("Log file {:?} has no file name", path))?;
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn read_steps(path: &Path) -> Result<Vec<ActionStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read action list {:?}", path))?;
    parse_steps(&text).with_context(|| format!("Invalid action list {:?}", path))
}

fn read_schema(path: &Path) -> Result<RowMetadata> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read schema {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid schema {:?}", path))
}

fn open_input(path: &Path) -> Result<BufReader<Box<dyn Read + Send>>> {
    let reader: Box<dyn Read + Send> = if path == Path::new("-") {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(path).with_context(|| format!("Failed to open input {:?}", path))?)
    };
    Ok(BufReader::new(reader))
}

fn open_source(input: &Path, schema: Option<&Path>) -> Result<Box<dyn RowSource>> {
    let reader = open_input(input)?;
    Ok(match schema {
        Some(schema) => Box::new(JsonLinesSource::new(reader, read_schema(schema)?)),
        None => Box::new(JsonLinesSource::infer(reader).context("Failed to infer schema")?),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

#[allow(clippy::too_many_arguments)]
fn run(
    config: &EngineConfig,
    actions: &Path,
    input: &Path,
    schema: Option<&Path>,
    output: Option<&Path>,
    metadata: Option<&Path>,
    runtime: Option<RuntimeKind>,
    options: BuildOptions,
) -> Result<()> {
    let steps = read_steps(actions)?;
    let mut source = open_source(input, schema)?;

    let cache = Arc::new(InMemoryCache::new());
    let key = CacheKey::new("cli", "run", "head");
    let sink = SinkSpec::Writer {
        writer: Box::new(JsonLinesWriter::new(open_output(output)?)),
        cache: Some((cache.clone() as Arc<dyn MetadataCache>, key.clone())),
    };

    let registry = ActionRegistry::builtin();
    let mut pipeline = PipelineBuilder::new(&registry)
        .with_options(options)
        .build(&steps, source.metadata().clone(), sink)?;

    let mut runtime_settings = config.runtime.clone();
    if let Some(kind) = runtime {
        runtime_settings.kind = kind;
    }
    let report = runtime_for(&runtime_settings).execute(
        &mut pipeline,
        source.as_mut(),
        &CancelToken::new(),
    )?;
    // Close the writer before looking at the cache
    drop(pipeline);
    eprint!("{}", report);

    if let Some(path) = metadata {
        let Some(final_metadata) = read_metadata(cache.as_ref(), &key)? else {
            bail!("No metadata was produced");
        };
        let json = serde_json::to_string_pretty(&final_metadata)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write metadata {:?}", path))?;
    }
    Ok(())
}

fn dump(actions: &Path, schema: Option<&Path>, input: Option<&Path>) -> Result<()> {
    let steps = read_steps(actions)?;
    let schema = match (schema, input) {
        (Some(schema), _) => read_schema(schema)?,
        (None, Some(input)) => open_source(input, None)?.metadata().clone(),
        (None, None) => bail!("Either --schema or --input is needed to build the graph"),
    };
    let registry = ActionRegistry::builtin();
    let pipeline = PipelineBuilder::new(&registry).build(&steps, schema, SinkSpec::Collector)?;
    print!("{}", visit::dump(&pipeline));
    Ok(())
}

fn list_actions() -> Result<()> {
    let registry = ActionRegistry::builtin();
    for name in registry.names() {
        let action = registry.resolve(name)?;
        let scopes: Vec<&str> = action.scopes().iter().map(|s| s.name()).collect();
        println!("{:<26} {:<24} {}", name, scopes.join(","), action.behavior());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(cli.config.as_deref());
    let _guard = init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Run {
            actions,
            input,
            schema,
            output,
            metadata,
            runtime,
            limit,
            sort,
            descending,
            diff,
            keep_deleted,
        } => {
            let mut options = BuildOptions::from_settings(&config.pipeline);
            options.limit = limit.or(options.limit);
            options.sort = sort.map(|column| SortSpec { column, descending });
            options.diff = diff.map(|reference_steps| DiffOptions { reference_steps });
            options.keep_deleted = keep_deleted;
            run(
                &config,
                &actions,
                &input,
                schema.as_deref(),
                output.as_deref(),
                metadata.as_deref(),
                runtime,
                options,
            )
        }
        Commands::Dump {
            actions,
            schema,
            input,
        } => dump(&actions, schema.as_deref(), input.as_deref()),
        Commands::Actions => list_actions(),
    }
}
