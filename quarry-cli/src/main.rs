//! Quarry CLI: terminal interface for the Quarry research pipeline.
//!
//! Runs a single research request, or one of the search tools directly.

mod commands;

use clap::{CommandFactory, Parser};
use quarry_core::config::{QuarryConfig, load_config, load_config_file};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Quarry: cited research reports from a single question
#[derive(Parser, Debug)]
#[command(name = "quarry", version, about, long_about = None)]
pub struct Cli {
    /// Research query
    query: Option<String>,

    /// Workspace directory (searched for .quarry/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for reports and charts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Search without running the research pipeline
    Search {
        /// Search query
        query: String,
        /// Use scholarly sources (Google Scholar, then arXiv)
        #[arg(long, conflicts_with = "comprehensive")]
        academic: bool,
        /// Combine web, encyclopedic and scholarly sources (fixed result counts)
        #[arg(long, conflicts_with = "max_results")]
        comprehensive: bool,
        /// Maximum results
        #[arg(short = 'n', long, default_value = "5")]
        max_results: usize,
    },
    /// Look for a source that speaks to a claim
    FactCheck {
        /// The claim to check
        claim: String,
    },
    /// Print the readable text of a web page
    Fetch {
        /// Page URL
        url: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "quarry", "quarry")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "quarry.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = resolve_config(&cli)?;

    if let Some(command) = cli.command {
        return commands::handle_command(command, &config).await;
    }

    match cli.query {
        Some(query) => commands::run_research(&query, &config, cli.quiet).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Load configuration and apply command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<QuarryConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path),
        None => {
            let workspace = cli
                .workspace
                .canonicalize()
                .unwrap_or_else(|_| cli.workspace.clone());
            load_config(Some(&workspace), None)
        }
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(output) = &cli.output {
        config.output.dir = output.clone();
    }
    if cli.no_charts {
        config.output.charts = false;
    }
    Ok(config)
}
