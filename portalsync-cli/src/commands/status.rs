//! Status command - show what is on disk.

use anyhow::Result;
use clap::Args;

use portalsync_core::ArtifactStore;
use portalsync_store::{AppConfig, JsonArtifactStore};

use crate::app;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the status command.
#[derive(Args, Default)]
pub struct StatusArgs {
    /// Only show this vendor.
    #[arg(long)]
    pub vendor: Option<String>,
}

/// Runs the status command.
///
/// Reads the aggregate state; nothing is written.
pub async fn run(args: &StatusArgs, config: &AppConfig, cli: &Cli) -> Result<()> {
    let store = JsonArtifactStore::new(config.storage_root());
    let mut aggregate = store.load_aggregate_state().await;

    if let Some(name) = args.vendor.as_deref() {
        let kinds = app::select_vendors(config, Some(name))?;
        aggregate
            .vendors
            .retain(|key, _| kinds.iter().any(|k| k.cli_name() == key));
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_status(&aggregate, store.root()));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&aggregate)?);
        }
    }

    Ok(())
}
