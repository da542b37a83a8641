//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;

use portalsync_core::VendorKind;
use portalsync_fetch::CycleReport;
use portalsync_providers::VendorDescriptor;

// ============================================================================
// Output Types
// ============================================================================

/// Result of a `once` run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclesOutput<'a> {
    pub reports: &'a [CycleReport],
    pub failures: &'a [String],
}

/// Vendor info output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorInfoOutput {
    pub cli_name: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub enabled: bool,
    pub home_url: String,
    pub applications: Vec<String>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats the reports and failures of a `once` run.
    pub fn format_cycles(&self, reports: &[CycleReport], failures: &[String]) -> Result<String> {
        self.format(&CyclesOutput { reports, failures })
    }

    /// Formats the vendor list.
    pub fn format_vendors(
        &self,
        vendors: &[VendorDescriptor],
        enabled: &[VendorKind],
    ) -> Result<String> {
        let outputs: Vec<VendorInfoOutput> = vendors
            .iter()
            .map(|desc| VendorInfoOutput {
                cli_name: desc.cli_name().to_string(),
                display_name: desc.display_name().to_string(),
                aliases: desc.aliases.iter().map(ToString::to_string).collect(),
                enabled: enabled.contains(&desc.kind),
                home_url: desc.defaults.home_url.to_string(),
                applications: (desc.applications)().into_iter().map(|a| a.id).collect(),
            })
            .collect();
        self.format(&outputs)
    }
}
