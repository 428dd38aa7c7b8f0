//! docbot command-line interface.

mod commands;

use clap::{Parser, Subcommand};
use docbot_core::{logging, AppConfig, AppResult};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docbot",
    version,
    about = "Documentation chat assistant with retrieval-augmented answers"
)]
struct Cli {
    /// Path to a YAML config file (default: ./docbot.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Socket address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ingest documentation files or directories into the vector store
    Ingest {
        /// Documentation files and/or directory trees
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Drop the collection before ingesting
        #[arg(long)]
        reset: bool,
    },

    /// Retrieve chunks for a question without generating an answer
    Query {
        /// The question to search for
        question: String,

        /// Number of chunks to return (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show vector store statistics
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let bind = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };

    let config = AppConfig::load()?.with_overrides(
        cli.config,
        bind,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    )?;
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    match cli.command {
        Commands::Serve { .. } => commands::serve::run(config).await,
        Commands::Ingest { paths, reset } => commands::ingest::run(config, &paths, reset).await,
        Commands::Query {
            question,
            top_k,
            json,
        } => commands::query::run(config, &question, top_k, json).await,
        Commands::Stats => commands::stats::run(config).await,
    }
}
