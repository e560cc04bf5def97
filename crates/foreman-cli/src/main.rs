//! Foreman CLI - feature requests routed to advisory roles, driven to a PR
//!
//! Usage:
//!   foreman init                      Write default config to .foreman/
//!   foreman route <story.json>        Preview the role set for a request
//!   foreman run <request> --repo o/r  Run the full workflow

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foreman_agent::AnthropicClient;
use foreman_core::{ForemanConfig, StructuredRequest};
use foreman_github::GitHubClient;
use foreman_orchestrator::{execution_order, route, Coordinator};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "foreman")]
#[command(author, version, about = "Feature-request routing and sequencing engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing .foreman/config.toml
    #[arg(long, default_value = ".")]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Preview routing for a structured request stored as JSON
    Route {
        /// Path to a structured request JSON file
        request: PathBuf,
    },

    /// Run the full workflow for a feature request
    Run {
        /// Free-text description of the feature
        request: String,

        /// Target repository (org/repo)
        #[arg(short, long)]
        repo: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Init { path } => {
            let config_path = ForemanConfig::write_default(&path)
                .context("Failed to write default configuration")?;
            println!("Wrote {}", config_path.display());
        }

        Commands::Route { request } => {
            let content = std::fs::read_to_string(&request)
                .with_context(|| format!("Failed to read {}", request.display()))?;
            let request: StructuredRequest =
                serde_json::from_str(&content).context("Invalid structured request")?;

            let roles = route(&request);
            println!("Roles for '{}':", request.title);
            for role in execution_order(&roles) {
                println!("  {}", role);
            }
        }

        Commands::Run { request, repo } => {
            let config = ForemanConfig::load_or_default(&cli.config_root)
                .context("Failed to load configuration")?;

            let generation =
                AnthropicClient::from_config(&config).context("Failed to build model client")?;
            let hosting =
                GitHubClient::from_config(&config).context("Failed to build GitHub client")?;

            let mut coordinator = Coordinator::new(config, generation, hosting)
                .context("Failed to build coordinator")?;

            let pull_request = coordinator.handle_request(&request, &repo).await?;
            println!("{}", pull_request.url);
        }
    }

    Ok(())
}
