//! CLI output formatting tests.

use chrono::{TimeZone, Utc};
use std::path::Path;

use portalsync_core::{AggregateState, ArtifactRecord, Category, VendorKind, VendorState};
use portalsync_fetch::{ApplicationReport, CycleReport, FailedTransfer};
use portalsync_providers::VendorRegistry;

use super::json::JsonFormatter;
use super::text::{TextFormatter, format_size};

fn record() -> ArtifactRecord {
    ArtifactRecord {
        category: Category::Client,
        version: "4.45.10".to_string(),
        file_name: "ISTA_4.45.10.exe".to_string(),
        file_path: "/srv/portalsync/bmw/ISTA_4.45.10.exe".to_string(),
        file_size: 3 * 1024 * 1024,
        downloaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        application_type: "ista".to_string(),
        display_name: "ISTA Client".to_string(),
        original_filename: None,
        url: "https://aos.bmwgroup.com/downloadservice/ISTA_4.45.10.exe".to_string(),
    }
}

fn report() -> CycleReport {
    let started_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    CycleReport {
        vendor: VendorKind::Bmw,
        started_at,
        finished_at: started_at + chrono::Duration::seconds(42),
        applications: vec![ApplicationReport {
            application: "ista".to_string(),
            found: 2,
            accepted: 2,
            downloaded: vec![record()],
            failed: vec![FailedTransfer {
                category: Category::ProgrammingData,
                version: "4.45.10".to_string(),
                reason: "empty file".to_string(),
            }],
            discovery_error: None,
        }],
        cancelled: false,
    }
}

#[test]
fn test_format_size() {
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(1536), "1.5 KB");
    assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
}

#[test]
fn test_cycle_text_lists_downloads_and_failures() {
    let text = TextFormatter::new(false).format_cycle(&report());

    assert!(text.starts_with("BMW AOS (42s)"));
    assert!(text.contains("ista       2 found, 2 new, 1 downloaded"));
    assert!(text.contains("↓ client"));
    assert!(text.contains("ISTA_4.45.10.exe"));
    assert!(text.contains("✗ programming_data"));
    assert!(text.contains("empty file"));
}

#[test]
fn test_plain_text_has_no_escape_codes() {
    let text = TextFormatter::new(false).format_cycle(&report());
    assert!(!text.contains('\x1b'));

    let colored = TextFormatter::new(true).format_cycle(&report());
    assert!(colored.contains("\x1b[1m"));
}

#[test]
fn test_status_empty() {
    let text = TextFormatter::new(false).format_status(&AggregateState::default(), Path::new("/srv"));
    assert!(text.contains("Last update: never"));
    assert!(text.contains("No artifacts downloaded yet"));
}

#[test]
fn test_status_lists_records() {
    let mut state = VendorState::new();
    state.upsert(record());
    let mut aggregate = AggregateState::default();
    aggregate.apply(VendorKind::Bmw, &state, Utc::now());

    let text = TextFormatter::new(false).format_status(&aggregate, Path::new("/srv"));

    assert!(text.contains("BMW AOS (checked never)"));
    assert!(text.contains("3.0 MB"));
    assert!(text.contains("ISTA_4.45.10.exe"));
}

#[test]
fn test_vendor_line() {
    let desc = VendorRegistry::get(VendorKind::Bmw).unwrap();
    let line = TextFormatter::new(false).format_vendor_line(desc, true);
    assert!(line.contains("bmw"));
    assert!(line.contains("✓"));
    assert!(line.contains("ista, esys"));
}

#[test]
fn test_cycles_json() {
    let json = JsonFormatter::new(false)
        .format_cycles(&[report()], &["mercedes: login failed".to_string()])
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["reports"][0]["vendor"], "bmw");
    assert_eq!(value["reports"][0]["applications"][0]["found"], 2);
    assert_eq!(value["failures"][0], "mercedes: login failed");
}

#[test]
fn test_vendors_json() {
    let json = JsonFormatter::new(true)
        .format_vendors(VendorRegistry::all(), &[VendorKind::Mercedes])
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let list = value.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["cliName"], "bmw");
    assert_eq!(list[0]["enabled"], false);
    assert_eq!(list[1]["enabled"], true);
}
