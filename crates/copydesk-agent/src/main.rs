//! # copydesk
//!
//! Command-line entry point: loads settings, wires the LLM client, tool
//! providers and tenant directory, and runs one generation or follow-up.
//! Progress lines stream to stderr; the resulting content is printed to
//! stdout as JSON.

#![deny(unsafe_code)]

mod wiring;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copydesk_core::{ChannelLogSink, ContentState, Modality, RequestLog};
use copydesk_runtime::{FollowupRouter, GenerateRequest, Orchestrator};
use copydesk_settings::CopydeskSettings;
use tokio::task::JoinHandle;
use tracing::info;

/// Marketing copy generator.
#[derive(Parser, Debug)]
#[command(name = "copydesk", about = "Generate and refine social-media posts")]
struct Cli {
    /// Settings file (defaults to `~/.copydesk/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Tenant whose company profile applies.
    #[arg(long, global = true, default_value = "default")]
    tenant: String,

    /// Target platform: linkedin, twitter, tiktok or instagram.
    #[arg(long, global = true, default_value = "linkedin")]
    modality: String,

    /// Suppress progress lines on stderr.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new post.
    Generate {
        /// What the post should be about.
        prompt: String,

        /// Skip the visual.
        #[arg(long)]
        no_image: bool,
    },
    /// Modify an existing post.
    Followup {
        /// The change to make.
        query: String,

        /// JSON file holding the previous result.
        #[arg(long)]
        state: PathBuf,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<CopydeskSettings> {
    let settings = match path {
        Some(path) => copydesk_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => copydesk_settings::load_settings().context("Failed to load settings")?,
    };
    Ok(settings)
}

fn init_logging(settings: &CopydeskSettings) {
    if settings.logging.json {
        copydesk_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        copydesk_core::logging::init_subscriber(&settings.logging.level);
    }
}

/// Progress log printing to stderr, plus the task draining it.
fn progress_log(settings: &CopydeskSettings, quiet: bool) -> (RequestLog, Option<JoinHandle<()>>) {
    if quiet {
        return (RequestLog::disabled(), None);
    }
    let (sink, mut rx) = ChannelLogSink::new();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            eprintln!("{line}");
        }
    });
    let log = RequestLog::new(
        Arc::new(sink),
        Duration::from_millis(settings.logging.sink_timeout_ms),
    );
    (log, Some(printer))
}

fn read_state(path: &PathBuf) -> Result<ContentState> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid state file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref())?;
    init_logging(&settings);

    let modality = Modality::parse_lenient(&cli.modality);
    let (llm, registry, tenants) = wiring::collaborators(&settings)?;
    info!(model = llm.model(), %modality, tenant = %cli.tenant, "copydesk starting");
    let orchestrator = Arc::new(Orchestrator::from_settings(llm, registry, tenants, &settings));

    let (log, printer) = progress_log(&settings, cli.quiet);
    let state = match cli.command {
        Command::Generate { prompt, no_image } => {
            let request = GenerateRequest::new(prompt, cli.tenant)
                .with_modality(modality)
                .with_image(!no_image);
            orchestrator.generate(&request, &log).await?
        }
        Command::Followup { query, state } => {
            let existing = read_state(&state)?;
            FollowupRouter::new(orchestrator)
                .route(&query, &existing, modality, &cli.tenant, &log)
                .await
        }
    };

    drop(log);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
