//! Binary entry point for hiddenthread.
//!
//! This binary provides the CLI interface for need/availability matching.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use hiddenthread::config::{CONFIG_PATH_ENV, HiddenThreadConfig};
use hiddenthread::observability;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// HiddenThread - Connects what people need with what others have.
#[derive(Parser)]
#[command(name = "hiddenthread")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract, match and suggest over a JSON file of notes.
    Process {
        /// JSON array of note strings, or `{"notes": [...]}`.
        notes: PathBuf,
    },

    /// Match pre-extracted notes.
    Match {
        /// JSON array of extraction objects, or a snapshot with `--snapshot`.
        input: PathBuf,

        /// Treat the input as a saved index snapshot.
        #[arg(long)]
        snapshot: bool,
    },

    /// Embed pre-extracted notes and save an index snapshot.
    Snapshot {
        /// JSON array of extraction objects.
        input: PathBuf,

        /// Output file.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Show configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(
    command: Commands,
    config: &HiddenThreadConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Process { notes } => commands::cmd_process(config, &notes),
        Commands::Match { input, snapshot } => commands::cmd_match(config, &input, snapshot),
        Commands::Snapshot { input, out } => commands::cmd_snapshot(config, &input, &out),
        Commands::Config { show } => commands::cmd_config(config, show),
    }
}

/// Loads configuration, then applies environment overrides.
fn load_config(path: Option<&Path>) -> Result<HiddenThreadConfig, Box<dyn std::error::Error>> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        return Ok(HiddenThreadConfig::load_from_file(config_path)?.with_env_overrides());
    }

    // Environment override for config path
    if let Some(config_path) = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        return Ok(HiddenThreadConfig::load_from_file(Path::new(&config_path))?
            .with_env_overrides());
    }

    // Otherwise, load from default location
    Ok(HiddenThreadConfig::load_default().with_env_overrides())
}
