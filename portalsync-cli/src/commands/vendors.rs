//! Vendors command - list supported vendors.

use anyhow::Result;

use portalsync_providers::VendorRegistry;
use portalsync_store::AppConfig;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the vendors command.
pub fn run(config: &AppConfig, cli: &Cli) -> Result<()> {
    let enabled = config.enabled_vendors();
    let vendors = VendorRegistry::all();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_vendors_header());
            println!("{}", "─".repeat(70));
            for desc in vendors {
                println!("{}", formatter.format_vendor_line(desc, enabled.contains(&desc.kind)));
            }
            println!();
            println!("Total: {} vendors ({} enabled)", vendors.len(), enabled.len());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_vendors(vendors, &enabled)?);
        }
    }

    Ok(())
}
