//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};
use std::path::Path;

use portalsync_core::{AggregateState, ArtifactRecord, VendorKind, VendorState};
use portalsync_fetch::{ApplicationReport, CycleReport};
use portalsync_providers::VendorDescriptor;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    /// Formats the outcome of one cycle.
    pub fn format_cycle(&self, report: &CycleReport) -> String {
        let mut lines = Vec::new();

        let duration = (report.finished_at - report.started_at).num_seconds();
        let mut header = format!(
            "{} {}",
            self.bold(report.vendor.display_name()),
            self.dim(&format!("({duration}s)"))
        );
        if report.cancelled {
            header.push(' ');
            header.push_str(&self.yellow("cancelled"));
        }
        lines.push(header);

        for app in &report.applications {
            lines.push(self.format_application(app));
            for record in &app.downloaded {
                lines.push(format!(
                    "    {} {:<18} {} {}",
                    self.green("↓"),
                    record.category.as_str(),
                    self.cyan(&record.version),
                    self.dim(&record.file_name)
                ));
            }
            for failed in &app.failed {
                lines.push(format!(
                    "    {} {:<18} {} {}",
                    self.red("✗"),
                    failed.category.as_str(),
                    failed.version,
                    self.dim(&failed.reason)
                ));
            }
        }

        lines.join("\n")
    }

    fn format_application(&self, app: &ApplicationReport) -> String {
        let summary = format!(
            "{} found, {} new, {} downloaded",
            app.found,
            app.accepted,
            app.downloaded.len()
        );
        match &app.discovery_error {
            Some(error) => format!("  {:<10} {} {}", app.application, summary, self.red(error)),
            None => format!("  {:<10} {summary}", app.application),
        }
    }

    /// Formats a failed vendor cycle.
    pub fn format_failure(&self, message: &str) -> String {
        format!("{} {message}", self.red("Error:"))
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Formats the aggregate state.
    pub fn format_status(&self, aggregate: &AggregateState, root: &Path) -> String {
        let mut lines = vec![
            format!("{} {}", self.bold("Storage:"), root.display()),
            format!(
                "{} {}",
                self.bold("Last update:"),
                format_time(aggregate.last_global_update)
            ),
        ];

        if aggregate.vendors.is_empty() {
            lines.push(String::new());
            lines.push(self.dim("No artifacts downloaded yet"));
            return lines.join("\n");
        }

        for (name, state) in &aggregate.vendors {
            lines.push(String::new());
            lines.push(self.format_vendor_state(name, state));
        }

        lines.join("\n")
    }

    fn format_vendor_state(&self, name: &str, state: &VendorState) -> String {
        let title = VendorKind::from_cli_name(name).map_or(name, |k| k.display_name());
        let mut lines = vec![format!(
            "{} {}",
            self.bold(title),
            self.dim(&format!("(checked {})", format_time(state.last_update)))
        )];

        if state.artifacts.is_empty() {
            lines.push(format!("  {}", self.dim("none")));
        }
        for record in state.artifacts.values() {
            lines.push(self.format_record(record));
        }

        lines.join("\n")
    }

    fn format_record(&self, record: &ArtifactRecord) -> String {
        format!(
            "  {:<18} {:<14} {:>10}  {}",
            record.category.as_str(),
            self.cyan(&record.version),
            format_size(record.file_size),
            record.file_name
        )
    }

    // ========================================================================
    // Vendors
    // ========================================================================

    /// Formats the vendor table header.
    pub fn format_vendors_header(&self) -> String {
        self.bold(&format!(
            "{:<24} {:<10} {:<8} {}",
            "Vendor", "CLI", "Enabled", "Applications"
        ))
    }

    /// Formats one vendor table row.
    pub fn format_vendor_line(&self, desc: &VendorDescriptor, enabled: bool) -> String {
        let status = if enabled { self.green("✓") } else { self.dim("−") };
        let apps: Vec<String> = (desc.applications)().into_iter().map(|a| a.id).collect();
        format!(
            "{:<24} {:<10} {:<8} {}",
            desc.display_name(),
            desc.cli_name(),
            status,
            apps.join(", ")
        )
    }

    // ========================================================================
    // Colors
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "never".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}
