//! Once command - one cycle per vendor, then exit.

use anyhow::Result;
use clap::Args;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use portalsync_fetch::CycleReport;
use portalsync_store::AppConfig;

use crate::app;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the once command.
#[derive(Args, Default)]
pub struct OnceArgs {
    /// Vendor to check (default: all enabled vendors).
    #[arg(long)]
    pub vendor: Option<String>,
}

/// Runs the once command.
///
/// Fails if any vendor's cycle failed, after printing the others.
pub async fn run(args: &OnceArgs, config: &AppConfig, cli: &Cli) -> Result<()> {
    let vendors = app::select_vendors(config, args.vendor.as_deref())?;
    let loops = app::build_loops(config, &vendors)?;
    let shutdown = CancellationToken::new();

    let results = join_all(loops.iter().map(|l| l.run_once(&shutdown))).await;

    let mut reports: Vec<CycleReport> = Vec::new();
    let mut failures = Vec::new();
    for (kind, result) in vendors.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => failures.push(format!("{kind}: {e}")),
        }
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for report in &reports {
                println!("{}", formatter.format_cycle(report));
            }
            for failure in &failures {
                println!("{}", formatter.format_failure(failure));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_cycles(&reports, &failures)?);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} vendor cycles failed", failures.len(), vendors.len())
    }
}
