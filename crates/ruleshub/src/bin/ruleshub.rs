//! ruleshub: query configured rule sources from the command line.
//!
//! Sources come from `--sources-file` when given, otherwise from
//! `RULESHUB_SOURCES_<n>_*` / `RULE_DIRECTORY` environment variables
//! (a `.env` file is honoured).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use ruleshub::config::{load_dotenv, EnvSourceProvider, FileSourceProvider, SourceProvider};
use ruleshub::{RulesHub, RulesHubTool};

// ── CLI ─────────────────────────────────────────────────────────────

/// Serve contextual rules for AI agents.
#[derive(Parser, Debug)]
#[command(name = "ruleshub", version, about)]
struct Cli {
    /// YAML/JSON file listing rule sources (`sources: [{loaderType, settings}]`).
    #[arg(long, env = "RULESHUB_SOURCES_FILE")]
    sources_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List metadata of every rule.
    List,
    /// Print one rule including its content.
    Get {
        /// Rule id (normalized before lookup).
        id: String,
    },
    /// Print the agent tool definition.
    Definition,
    /// Execute a raw tool request, e.g. '{"action":"GetAllRulesMetadata"}'.
    Exec {
        input: String,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let provider: Arc<dyn SourceProvider> = match &cli.sources_file {
        Some(path) => {
            info!(path = %path, "reading rule sources from file");
            Arc::new(FileSourceProvider::new(path))
        }
        None => Arc::new(EnvSourceProvider::default()),
    };
    let hub = Arc::new(RulesHub::with_provider(provider));
    let tool = RulesHubTool::new(Arc::clone(&hub));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let output = match cli.command {
        Command::List => serde_json::to_value(hub.get_all_metadata(&cancel).await?)?,
        Command::Get { id } => serde_json::to_value(hub.get_content_by_id(&id, &cancel).await?)?,
        Command::Definition => serde_json::to_value(tool.definition())?,
        Command::Exec { input } => tool.execute(serde_json::from_str(&input)?, &cancel).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
