//! CLI wiring for the speed test.

use crate::bench::{BenchmarkLoop, ResetPolicy};
use crate::cancel::{install_interrupt_handler, CancellationToken};
use anyhow::{Context, Result};
use clap::Parser;
use nmtbench_decoder::{
    DecoderSession, DeviceInventory, ModelConfig, Suggestion, TranslationRequest,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nmt-speed-test",
    about = "Measure cold-start translation latency until interrupted"
)]
pub struct Cli {
    /// Model directory containing model.json, or the config file itself.
    pub model: PathBuf,

    /// Compute device index.
    #[arg(short = 'g', long = "gpu", default_value_t = 0)]
    pub gpu: usize,

    #[arg(long, default_value = "en")]
    pub source: String,

    #[arg(long, default_value = "it")]
    pub target: String,

    #[arg(long, default_value = "and")]
    pub text: String,

    /// JSON file with an array of suggestions.
    #[arg(long)]
    pub suggestions: Option<PathBuf>,

    /// Skip the per-iteration reset.
    #[arg(long, default_value_t = false)]
    pub warm: bool,

    /// Write the summary as JSON here on exit.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let token = CancellationToken::new();
    install_interrupt_handler(token.clone()).context("failed to install interrupt handler")?;

    let Some(session) = load_session(&cli.model, cli.gpu, &token)? else {
        info!("interrupted during startup");
        return Ok(());
    };

    let suggestions = match &cli.suggestions {
        Some(path) => load_suggestions(path)?,
        None => Vec::new(),
    };
    let request =
        TranslationRequest::new(cli.source, cli.target, cli.text).with_suggestions(suggestions);
    let policy = if cli.warm {
        ResetPolicy::Warm
    } else {
        ResetPolicy::Cold
    };

    let mut bench =
        BenchmarkLoop::new(session, io::stdout().lock(), request, token).with_policy(policy);
    let summary = bench.run()?;

    if let Some(path) = cli.report {
        summary.save(&path)?;
        info!(path = %path.display(), "wrote benchmark summary");
    }

    Ok(())
}

/// Startup phases ahead of the loop. Returns `None` when the token is
/// cancelled between phases.
fn load_session(
    model: &Path,
    gpu: usize,
    token: &CancellationToken,
) -> Result<Option<DecoderSession>> {
    let config = ModelConfig::load(model)?;
    let start = Instant::now();
    let pool = config.checkpoint_pool()?;
    info!(
        "[1/2] loaded {} checkpoints in {:.1}s",
        pool.len(),
        start.elapsed().as_secs_f64()
    );
    if token.is_cancelled() {
        return Ok(None);
    }

    let start = Instant::now();
    let inventory = DeviceInventory::detect();
    let session = DecoderSession::construct(&inventory, gpu, pool, config)?;
    info!(
        "[2/2] decoder created in {:.1}s",
        start.elapsed().as_secs_f64()
    );
    if let Some(checkpoint) = session.loaded_checkpoint() {
        info!(
            checkpoint = checkpoint.name(),
            path = %checkpoint.path().display(),
            "initial checkpoint"
        );
    }
    if token.is_cancelled() {
        return Ok(None);
    }
    Ok(Some(session))
}

fn load_suggestions(path: &Path) -> Result<Vec<Suggestion>> {
    let blob = fs::read_to_string(path)
        .with_context(|| format!("failed to read suggestions {}", path.display()))?;
    serde_json::from_str(&blob)
        .with_context(|| format!("malformed suggestions file {}", path.display()))
}
