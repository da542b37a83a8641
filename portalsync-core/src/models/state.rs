//! Persisted state.
//!
//! [`VendorState`] is the per-vendor record of what was downloaded;
//! [`AggregateState`] is the cross-vendor copy read by status surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::artifact::{ArtifactRecord, Category};
use crate::models::vendor::VendorKind;

/// Schema version tag written into the aggregate state.
pub const SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// Vendor State
// ============================================================================

/// Per-vendor persisted state.
///
/// Holds exactly one live record per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorState {
    /// Last completed discovery pass.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    /// Live record per category.
    #[serde(default)]
    pub artifacts: BTreeMap<Category, ArtifactRecord>,
}

impl VendorState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `last_update`; never moves it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        match self.last_update {
            Some(prev) if prev >= now => {}
            _ => self.last_update = Some(now),
        }
    }

    /// Returns the live record for a category.
    pub fn record(&self, category: Category) -> Option<&ArtifactRecord> {
        self.artifacts.get(&category)
    }

    /// Returns the recorded version for a category.
    pub fn recorded_version(&self, category: Category) -> Option<&str> {
        self.record(category).map(|r| r.version.as_str())
    }

    /// Replaces the live record of the record's category.
    pub fn upsert(&mut self, record: ArtifactRecord) -> Option<ArtifactRecord> {
        self.artifacts.insert(record.category, record)
    }

    /// Drops the live record for a category.
    pub fn remove(&mut self, category: Category) -> Option<ArtifactRecord> {
        self.artifacts.remove(&category)
    }

    /// Returns true if `file_name` is the live file of a category other than `except`.
    pub fn is_live_file_of_other(&self, file_name: &str, except: Category) -> bool {
        self.artifacts
            .values()
            .any(|r| r.category != except && r.file_name == file_name)
    }
}

// ============================================================================
// Aggregate State
// ============================================================================

/// Cross-vendor denormalized state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    /// Schema version tag.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Last time any vendor's state changed.
    #[serde(default)]
    pub last_global_update: Option<DateTime<Utc>>,
    /// Copy of each vendor's state, keyed by vendor CLI name.
    #[serde(default)]
    pub vendors: BTreeMap<String, VendorState>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for AggregateState {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            last_global_update: None,
            vendors: BTreeMap::new(),
        }
    }
}

impl AggregateState {
    /// Replaces one vendor's copy and advances the global timestamp.
    pub fn apply(&mut self, vendor: VendorKind, state: &VendorState, now: DateTime<Utc>) {
        self.vendors.insert(vendor.cli_name().to_string(), state.clone());
        self.schema_version = default_schema_version();
        match self.last_global_update {
            Some(prev) if prev >= now => {}
            _ => self.last_global_update = Some(now),
        }
    }

    /// Returns a vendor's copy.
    pub fn vendor(&self, vendor: VendorKind) -> Option<&VendorState> {
        self.vendors.get(vendor.cli_name())
    }
}

// ============================================================================
// Tests
// ============================================================================
