//! Resizer CLI - command-line host for the Resizer image conversion unit.
//!
//! The binary plays the host side of the unit's boundary: it copies file
//! bytes into the unit's source region, picks a transform, and saves the
//! published result next to the source (or into the configured directory).
//!
//! # Usage
//!
//! ```bash
//! # Downscale a single image to a tenth of its size
//! resizer convert photo.png
//!
//! # Grayscale, explicit output path
//! resizer convert photo.jpg --mode grayscale --output gray.jpg
//!
//! # Long-running host fed from stdin
//! resizer session
//!
//! # View configuration
//! resizer config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Resizer - decode, resize or grayscale, and re-encode png/jpeg/gif images.
#[derive(Parser, Debug)]
#[command(name = "resizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "RESIZER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert one image and save the result
    Convert(cli::convert::ConvertArgs),

    /// Serve conversion requests read from stdin until shutdown
    Session(cli::session::SessionArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => resizer_core::Config::load_from(path)?,
        None => match resizer_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. \
                     Check your config file with `resizer config path`."
                );
                resizer_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Resizer v{}", resizer_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Convert(args) => cli::convert::execute(args, &config).await,
        Commands::Session(args) => cli::session::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
