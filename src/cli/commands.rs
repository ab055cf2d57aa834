//! CLI command definitions for lesson_forge.
//!
//! Two subcommands, one per pipeline: `worksheet` for differentiated
//! worksheets and `lesson` for localized narrative content. Both share the
//! same run loop and configuration knobs.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::generation::backend::{GenAiClient, GenerationBackend};
use crate::generation::fallback::FallbackEngine;
use crate::guidelines::GuidelineStore;
use crate::pipeline::controller::{LoopController, RunOutcome, RunReport};
use crate::pipeline::gate::QualityGate;
use crate::stages::{build_pipeline, seed_state, PipelineKind};

/// Differentiated educational content generator with quality-gated retries.
#[derive(Parser)]
#[command(name = "lesson_forge")]
#[command(about = "Generate grade-differentiated, localized educational content")]
#[command(version)]
#[command(
    long_about = "lesson_forge turns a free-text teacher request into per-grade content.\n\nEach run analyzes the request, picks target grade levels, generates one artifact per\ngrade (external backend with deterministic template fallback), and retries the whole\npass until a quality gate accepts or the iteration budget runs out.\n\nExample usage:\n  lesson_forge worksheet \"Create a worksheet on photosynthesis for grade 7\"\n  lesson_forge lesson \"माती बद्दल गोष्ट\" --offline --output ./out"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate differentiated worksheets for a request.
    #[command(alias = "ws")]
    Worksheet(RunArgs),

    /// Generate localized narrative lesson content for a request.
    Lesson(RunArgs),
}

/// Arguments shared by both pipelines.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The free-text content request.
    pub request: String,

    /// Quality score required for unconditional acceptance.
    #[arg(long, env = "QUALITY_THRESHOLD")]
    pub threshold: Option<u32>,

    /// Maximum number of full pipeline passes.
    #[arg(long, env = "MAX_ITERATIONS")]
    pub max_iterations: Option<u32>,

    /// Directory holding grade_guidelines.json and cultural_guidelines.json.
    #[arg(long, env = "GUIDELINES_DIR")]
    pub guidelines: Option<PathBuf>,

    /// Model name passed to the generation backend.
    #[arg(short, long, env = "GENAI_MODEL")]
    pub model: Option<String>,

    /// Skip the external backend; synthesize everything from templates.
    #[arg(long)]
    pub offline: bool,

    /// Directory to write one file per grade; prints to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command with already-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Worksheet(args) => execute(PipelineKind::Worksheet, args).await,
        Commands::Lesson(args) => execute(PipelineKind::Lesson, args).await,
    }
}

async fn execute(kind: PipelineKind, args: RunArgs) -> anyhow::Result<()> {
    let mut config = RunConfig::from_env()?;
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(guidelines) = args.guidelines {
        config.guidelines_dir = guidelines;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    config.offline = config.offline || args.offline;
    config.validate()?;

    let store = GuidelineStore::load_dir(&config.guidelines_dir)?;
    let backend = resolve_backend(&config);
    let engine = Arc::new(FallbackEngine::new(backend)?);
    let pipeline = build_pipeline(kind, engine, config.grade_domain)?;
    let gate = QualityGate::new(config.threshold, config.relaxed_factor);
    let controller = LoopController::new(pipeline, gate, config.max_iterations);

    let state = seed_state(&args.request, &store)?;
    info!(run_id = %state.run_id(), ?kind, "starting run");
    let report = controller.run(state).await?;

    emit_report(&report, args.output.as_deref())?;
    Ok(())
}

fn resolve_backend(config: &RunConfig) -> Option<Arc<dyn GenerationBackend>> {
    if config.offline {
        info!("offline mode, template synthesis only");
        return None;
    }
    match GenAiClient::from_env(&config.model) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "no generation backend, template synthesis only");
            None
        }
    }
}

fn emit_report(report: &RunReport, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let outcome = match report.outcome {
        RunOutcome::Accepted => "accepted",
        RunOutcome::Exhausted => "budget exhausted",
    };
    println!(
        "Run {}: {} after {} pass(es), final score {}",
        report.run_id,
        outcome,
        report.passes(),
        report.final_score,
    );

    match output {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            for (grade, record) in report.artifacts.iter() {
                let path = dir.join(format!("grade_{grade}.md"));
                fs::write(&path, &record.content)?;
                println!("  wrote {} ({:?})", path.display(), record.method);
            }
        }
        None => {
            for (grade, record) in report.artifacts.iter() {
                println!("\n===== Grade {grade} ({:?}) =====\n", record.method);
                println!("{}", record.content);
            }
        }
    }
    Ok(())
}
