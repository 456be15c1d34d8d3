//! `forge` — a non-interactive driver over the generation & iteration
//! engine (§6 "External Interfaces"): a headless harness around the core
//! rather than the product's primary interface.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use forge_common::config::ForgeConfig;
use forge_orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "forge", about = "Drive the generation & iteration engine from the command line")]
struct Cli {
    /// Directory the VFS exports to and project memory is persisted under.
    #[arg(long, global = true, default_value = "./forge-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new project from a specification.
    Generate {
        project_id: String,
        project_name: String,
        spec: String,
    },
    /// Apply a natural-language edit to an existing project.
    Edit { project_id: String, instruction: String },
    /// Build and start a container preview for a project's current files.
    Preview { project_id: String },
    /// Print the commit history of a project's VFS.
    History { project_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ForgeConfig::load();
    let router = forge_llm::default_router(forge_llm::RouterConfig {
        circuit_breaker_threshold: config.circuit_breaker_threshold,
        circuit_breaker_reprobe: config.circuit_breaker_reprobe,
    });
    let orchestrator = Orchestrator::new(router, config, cli.data_dir.clone());

    match cli.command {
        Command::Generate {
            project_id,
            project_name,
            spec,
        } => commands::generate(&orchestrator, &project_id, &project_name, &spec).await,
        Command::Edit { project_id, instruction } => commands::edit(&orchestrator, &project_id, &instruction).await,
        Command::Preview { project_id } => commands::preview(&orchestrator, &project_id).await,
        Command::History { project_id } => commands::history(&orchestrator, &project_id).await,
    }
}
