//! effects - コマンド実行のデモ
//!
//! Wires the typed handlers into a `RealContext` and runs the fetch workflow
//! once, printing a JSON summary to stdout. Logs go to stderr.

mod clock;
mod commands;
mod handlers;
mod workflow;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use effects_core::{ContextOptions, DispatchCounts, InterpreterBuilder, RealContext};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::commands::{Get, Now};
use crate::handlers::{GetHandler, NowHandler};
use crate::workflow::Fetched;

#[derive(Parser, Debug)]
#[command(name = "effects")]
#[command(about = "Run a small workflow through the effects dispatcher")]
#[command(version)]
struct Cli {
    /// URL fetched by the Get command
    #[arg(long, default_value = workflow::DEFAULT_URL)]
    url: String,

    /// Context deadline in milliseconds (overrides the config file)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON file with context options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    #[serde(flatten)]
    fetched: Fetched,
    counts: DispatchCounts,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> anyhow::Result<ContextOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ContextOptions::from_json(&raw)
                .with_context(|| format!("invalid context options in {}", path.display()))?
        }
        None => ContextOptions::new(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        options.timeout_ms = Some(timeout_ms);
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let options = load_options(&cli)?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("effects/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let registry = InterpreterBuilder::new()
        .register::<Now, _>(NowHandler::new(SystemClock))?
        .register::<Get, _>(GetHandler::new(client))?
        .expect::<Now>()
        .expect::<Get>()
        .build()?;
    let ctx = RealContext::with_options(registry, &options);

    tracing::info!(url = %cli.url, timeout_ms = ?options.timeout_ms, "running workflow");
    let fetched = workflow::fetch_person(&ctx, &cli.url)
        .await
        .with_context(|| format!("workflow failed for {}", cli.url))?;

    let summary = RunSummary {
        fetched,
        counts: ctx.counts(),
    };
    tracing::info!(dispatched = summary.counts.dispatched, "done");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
