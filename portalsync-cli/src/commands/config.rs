//! Config command - inspect configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use portalsync_providers::VendorRegistry;
use portalsync_store::{AppConfig, default_config_dir};

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

impl ConfigArgs {
    /// Whether this is `config path`, which needs no loaded configuration.
    pub fn is_path(&self) -> bool {
        matches!(self.action, ConfigAction::Path)
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration, vendor defaults included.
    Show,

    /// Show configuration paths.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, config: &AppConfig, cli: &Cli) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(config, cli),
        ConfigAction::Path => show_paths(cli),
    }
}

/// The configuration with every registered vendor's resolved settings filled in.
fn effective_config(config: &AppConfig) -> Result<serde_json::Value> {
    let mut vendors = serde_json::Map::new();
    for desc in VendorRegistry::all() {
        let settings = config.vendor_settings(desc.kind);
        let resolved = desc.build_config(&settings)?;
        vendors.insert(
            desc.cli_name().to_string(),
            serde_json::json!({
                "enabled": config.enabled_vendors().contains(&desc.kind),
                "config": resolved,
            }),
        );
    }

    Ok(serde_json::json!({
        "general": config.general,
        "storage_root": config.storage_root().display().to_string(),
        "vendors": vendors,
    }))
}

fn show_config(config: &AppConfig, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            println!("# {}", cli.config_path().display());
            println!("{}", config.to_toml()?);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&effective_config(config)?)?);
        }
    }
    Ok(())
}

/// Prints the configuration and storage locations.
pub fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let config_file = cli.config_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:  {}", config_dir.display());
            println!("Config file: {}", config_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_file.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}
