//! usersim CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Resolve a task set and write the run report
//! - `doctor`  — Diagnose config, tokenizer, dataset, and provider health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod report;

#[derive(Parser)]
#[command(
    name = "usersim",
    about = "usersim — LLM user-simulation agent harness",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all tasks in the configured task set
    Run {
        /// Path to the TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resolve at most N tasks
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the report output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose the harness setup
    Doctor {
        /// Path to the TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            config,
            limit,
            output,
        } => commands::run::run(config, limit, output).await?,
        Commands::Doctor { config } => commands::doctor::run(config).await?,
    }

    Ok(())
}
