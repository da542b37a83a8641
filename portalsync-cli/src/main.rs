// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `PortalSync` CLI - unattended downloads from vendor diagnostic portals.
//!
//! # Examples
//!
//! ```bash
//! # Poll every enabled vendor until Ctrl+C
//! portalsync
//!
//! # One cycle for one vendor, then exit
//! portalsync once --vendor bmw
//!
//! # What is on disk
//! portalsync status --format json --pretty
//!
//! # Where the configuration lives
//! portalsync config path
//! ```

mod app;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, once, run, status, vendors};
use portalsync_store::AppConfig;

// ============================================================================
// CLI Definition
// ============================================================================

/// `PortalSync` CLI - vendor portal acquisition.
#[derive(Parser)]
#[command(name = "portalsync")]
#[command(about = "Unattended acquisition of vendor diagnostic software")]
#[command(long_about = r#"
PortalSync logs into vendor aftersales portals with a headless browser,
finds the current diagnostic software releases and keeps exactly one
live copy of each on disk.

Supported vendors:
  • BMW AOS (bmw)
  • Mercedes-Benz XENTRY (mercedes)

Credentials are read from the environment variables named in the
configuration file.

Examples:
  portalsync                     # Poll enabled vendors continuously
  portalsync once                # One cycle per vendor, then exit
  portalsync once --vendor bmw   # One cycle for one vendor
  portalsync status              # Downloaded artifacts
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'run' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file.
    #[arg(long, short = 'c', global = true, env = "PORTALSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(AppConfig::default_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll enabled vendors until interrupted (default).
    #[command(visible_alias = "r")]
    Run,

    /// Run exactly one cycle per vendor and exit.
    #[command(visible_alias = "o")]
    Once(once::OnceArgs),

    /// Show downloaded artifacts.
    #[command(visible_alias = "s")]
    Status(status::StatusArgs),

    /// List supported vendors.
    #[command(visible_alias = "v")]
    Vendors,

    /// Inspect configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// Configuration could not be loaded.
    Config = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, default_level: &str) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("portalsync=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("portalsync={default_level},warn")))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Config(args)) = &cli.command {
        if args.is_path() {
            return config::show_paths(&cli);
        }
    }

    let config_path = cli.config_path();
    let app_config = match AppConfig::load_from(&config_path).await {
        Ok(c) => c,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}: {e}", config_path.display());
            }
            std::process::exit(ExitCode::Config as i32);
        }
    };

    setup_logging(cli.verbose, cli.quiet, &app_config.general.log_level);

    let result = match &cli.command {
        Some(Commands::Run) | None => run::run(&app_config).await,
        Some(Commands::Once(args)) => once::run(args, &app_config, &cli).await,
        Some(Commands::Status(args)) => status::run(args, &app_config, &cli).await,
        Some(Commands::Vendors) => vendors::run(&app_config, &cli),
        Some(Commands::Config(args)) => config::run(args, &app_config, &cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::Error as i32);
    }

    Ok(())
}
