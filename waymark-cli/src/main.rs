use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::parse_point;
use config::load_config;
use error::CliError;

/// Offline routing over JSON road networks
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Network description in JSON
    #[arg(short, long)]
    network: PathBuf,
    /// Router settings in TOML
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route between two locations and print the route as GeoJSON
    Route {
        /// Start location as x,y
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        /// Finish location as x,y
        #[arg(long, allow_hyphen_values = true)]
        to: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Route every request of a JSON file of start and finish pairs in parallel
    Batch {
        requests: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Worker threads, all cores when unset
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Print per-region graph statistics
    Inspect,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    let source = commands::load_network(&cli.network)?;
    match cli.command {
        Command::Route { from, to, output } => {
            commands::route(source, config, parse_point(&from)?, parse_point(&to)?, output.as_deref())?;
        }
        Command::Batch {
            requests,
            output,
            threads,
        } => {
            if let Some(threads) = threads {
                if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
                    tracing::warn!("Keeping the default thread pool: {e}");
                }
            }
            commands::batch(source, &config, &requests, output.as_deref())?;
        }
        Command::Inspect => {
            commands::inspect(source, &config)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
