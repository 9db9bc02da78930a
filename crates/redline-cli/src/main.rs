use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use redline_config::{Config, EngineSettings};
use redline_engine::{EngineOptions, StepOutcome, StepReport, SuggestionEngine};
use redline_model::json::{NodeJson, StepJson};
use redline_model::{Node, Schema, SuggestionId, Transform};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Config file to use instead of ~/.config/redline/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record the steps of an edit as suggestions
    ///
    /// The input file holds `{"doc": ..., "steps": [...]}`, where the steps
    /// apply to `doc` in order.
    Suggest {
        input: PathBuf,

        /// Write the result to the named file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reject suggestions, restoring the content they changed
    Revert {
        input: PathBuf,

        #[command(flatten)]
        target: Target,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Accept suggestions, keeping their changes and dropping the annotations
    Accept {
        input: PathBuf,

        #[command(flatten)]
        target: Target,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List rendering hints for every suggestion in a document
    Decorations { input: PathBuf },

    /// List the suggestion ids present in a document
    Ids { input: PathBuf },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Target {
    /// A single suggestion
    #[arg(long)]
    id: Option<u64>,

    /// Every suggestion in the document
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Deserialize)]
struct EditInput {
    doc: NodeJson,
    #[serde(default)]
    steps: Vec<StepJson>,
}

#[derive(Debug, Serialize)]
struct SuggestOutput {
    doc: NodeJson,
    steps: Vec<StepJson>,
    report: Vec<StepReport>,
}

fn engine_options(settings: &EngineSettings) -> EngineOptions {
    EngineOptions {
        boundary_marker: settings.boundary_marker,
        marker_scan_window: settings.marker_scan_window,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => {
            let path = Config::expand_path(path);
            match Config::load_from_path(&path)? {
                Some(config) => Some(config),
                None => bail!("config file {} does not exist", path.display()),
            }
        }
        None => Config::load()?,
    };
    Ok(loaded.unwrap_or_default())
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// A document file holds either a bare document or the output of `suggest`.
fn read_doc(schema: &Schema, path: &Path) -> Result<Node> {
    let mut value = read_json(path)?;
    if value.get("type").is_none()
        && let Some(doc) = value.get_mut("doc")
    {
        value = doc.take();
    }
    schema
        .node_from_json(&value)
        .with_context(|| format!("invalid document in {}", path.display()))
}

fn read_edit(schema: &Schema, path: &Path) -> Result<Transform> {
    let input: EditInput = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("expected {{\"doc\", \"steps\"}} in {}", path.display()))?;
    let doc = schema.node_from_mirror(input.doc)?;
    let mut tr = Transform::new(doc);
    for (index, json) in input.steps.into_iter().enumerate() {
        let step = schema.step_from_mirror(json)?;
        tr.step(step)
            .with_context(|| format!("step {index} does not apply to the document"))?;
    }
    Ok(tr)
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<()> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn review(
    engine: &SuggestionEngine,
    doc: &Node,
    target: &Target,
    accept: bool,
) -> Result<Transform> {
    let tr = match (target.id.map(SuggestionId), accept) {
        (Some(id), true) => engine.apply_suggestion(doc, id)?,
        (Some(id), false) => engine.revert_suggestion(doc, id)?,
        (None, true) => engine.apply_all(doc)?,
        (None, false) => engine.revert_all(doc)?,
    };
    Ok(tr)
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let schema = Schema::basic();
    let engine = SuggestionEngine::new(&schema, engine_options(&config.engine))?;

    match &cli.command {
        Commands::Suggest { input, output } => {
            let edit = read_edit(&schema, input)?;
            let tracked = engine.transform_transaction(&edit);
            for report in &tracked.report {
                if let StepOutcome::NotHandled { reason } = &report.outcome {
                    log::warn!("step {} ({}) was not recorded: {reason}", report.index, report.kind);
                }
            }
            let result = SuggestOutput {
                doc: tracked.transform.doc().to_node_json(),
                steps: tracked
                    .transform
                    .steps()
                    .iter()
                    .map(|s| s.to_step_json())
                    .collect(),
                report: tracked.report,
            };
            write_output(&result, output.as_deref(), cli.pretty)
        }
        Commands::Revert {
            input,
            target,
            output,
        }
        | Commands::Accept {
            input,
            target,
            output,
        } => {
            let accept = matches!(cli.command, Commands::Accept { .. });
            let doc = read_doc(&schema, input)?;
            let tr = review(&engine, &doc, target, accept)?;
            log::info!(
                "{} {} with {} steps",
                if accept { "accepted" } else { "reverted" },
                target
                    .id
                    .map_or_else(|| "all suggestions".to_string(), |id| format!("suggestion {id}")),
                tr.steps().len()
            );
            write_output(&tr.doc().to_node_json(), output.as_deref(), cli.pretty)
        }
        Commands::Decorations { input } => {
            let doc = read_doc(&schema, input)?;
            write_output(&engine.query_decorations(&doc), None, cli.pretty)
        }
        Commands::Ids { input } => {
            let doc = read_doc(&schema, input)?;
            write_output(&engine.suggestion_ids(&doc), None, cli.pretty)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    env_logger::Builder::new()
        .filter_level(config.logging.level_filter())
        .parse_default_env()
        .init();
    log::debug!("engine settings: {:?}", config.engine);

    run(cli, &config)
}
