//! Forge CLI
//!
//! Replays recorded model responses through the streaming parser, the
//! action runners and the virtual file store.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about = "Forge - streaming artifact workbench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a model response and execute its actions
    Replay {
        /// Response file, `-` for stdin
        file: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(short = 'n', long, default_value_t = 64)]
        chunk_size: usize,

        /// Configuration file (defaults to forge.config.* in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Working directory prefix for file actions
        #[arg(short, long)]
        work_dir: Option<String>,

        /// Override the simulated shell duration in milliseconds
        #[arg(long)]
        shell_delay: Option<u64>,

        /// Print every parser event as it is routed
        #[arg(short, long)]
        events: bool,

        /// Print the final workbench snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a model response and print its events as JSON lines
    Parse {
        /// Response file, `-` for stdin
        file: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(short = 'n', long, default_value_t = 64)]
        chunk_size: usize,

        /// Configuration file providing the tag vocabulary
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate configuration
    Validate {
        /// Configuration file (defaults to forge.config.* in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "forge_cli=debug,forge_core=debug"
    } else {
        "forge_cli=info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting Forge CLI");

    let result = match cli.command {
        Commands::Replay {
            file,
            chunk_size,
            config,
            work_dir,
            shell_delay,
            events,
            json,
        } => {
            commands::replay::run(commands::replay::ReplayOptions {
                file,
                chunk_size,
                config,
                work_dir,
                shell_delay,
                events,
                json,
            })
            .await
        }
        Commands::Parse {
            file,
            chunk_size,
            config,
        } => commands::parse::run(&file, chunk_size, config.as_deref()).await,
        Commands::Validate { config } => commands::validate::run(config.as_deref()).await,
    };

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
