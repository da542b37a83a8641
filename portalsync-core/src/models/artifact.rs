//! Discovery and download types.
//!
//! - [`Category`] - Fixed semantic buckets
//! - [`CandidateLink`] - Transient link found while scanning a page
//! - [`CategorizedArtifact`] - Candidate enriched with category and version
//! - [`ArtifactRecord`] - Persisted description of a downloaded file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel version used when no version token could be extracted.
pub const UNKNOWN_VERSION: &str = "unknown";

// ============================================================================
// Category
// ============================================================================

/// A semantic bucket holding at most one live artifact per vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Diagnostic client installer.
    Client,
    /// Vehicle programming data.
    ProgrammingData,
    /// Diagnostic data package.
    DiagnosticData,
    /// PSdZ data archive used by coding tools.
    PsdzData,
    /// Launcher application.
    Launcher,
    /// Standalone installer.
    Installer,
    /// Incremental update or patch.
    Update,
    /// Generic data archive.
    DataArchive,
}

impl Category {
    /// Returns all categories.
    pub fn all() -> &'static [Category] {
        &[
            Self::Client,
            Self::ProgrammingData,
            Self::DiagnosticData,
            Self::PsdzData,
            Self::Launcher,
            Self::Installer,
            Self::Update,
            Self::DataArchive,
        ]
    }

    /// Returns the snake_case identifier used in files and state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::ProgrammingData => "programming_data",
            Self::DiagnosticData => "diagnostic_data",
            Self::PsdzData => "psdz_data",
            Self::Launcher => "launcher",
            Self::Installer => "installer",
            Self::Update => "update",
            Self::DataArchive => "data_archive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Candidate Link
// ============================================================================

/// How a candidate was found on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Hyperlink in the main document.
    Link,
    /// Button-like element with an inline download action in the main document.
    Button,
    /// Hyperlink inside a nested frame.
    FrameLink,
    /// Button-like element inside a nested frame.
    FrameButton,
}

impl DiscoveryMethod {
    /// Returns true if the candidate came from a nested frame.
    pub fn is_frame(&self) -> bool {
        matches!(self, Self::FrameLink | Self::FrameButton)
    }
}

/// A download link or button found on a loaded page.
///
/// Candidates live for one discovery pass and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// Visible text of the element.
    pub text: String,
    /// Absolute target URL, or the raw inline action when no URL could be resolved.
    pub url: String,
    /// How the candidate was found.
    pub method: DiscoveryMethod,
    /// Text of the element and its ancestors, nearest first.
    pub context: Vec<String>,
}

impl CandidateLink {
    /// Creates a candidate without surrounding context.
    pub fn new(text: impl Into<String>, url: impl Into<String>, method: DiscoveryMethod) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
            method,
            context: Vec::new(),
        }
    }
}

// ============================================================================
// Categorized Artifact
// ============================================================================

/// A candidate classified into exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedArtifact {
    /// The category this artifact fills.
    pub category: Category,
    /// Application surface the artifact was found on.
    pub application_type: String,
    /// Human-readable name.
    pub display_name: String,
    /// Extracted version, or [`UNKNOWN_VERSION`].
    pub version: String,
    /// File name reported by the vendor page, when the URL does not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    /// Download URL.
    pub url: String,
    /// Visible link text.
    pub link_text: String,
}

impl CategorizedArtifact {
    /// Returns true if a version token was extracted.
    pub fn has_known_version(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}

// ============================================================================
// Artifact Record
// ============================================================================

/// A downloaded artifact as persisted in the vendor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// Category this record occupies.
    pub category: Category,
    /// Version of the downloaded artifact.
    pub version: String,
    /// File name inside the vendor storage directory.
    pub file_name: String,
    /// Full path of the file on disk.
    pub file_path: String,
    /// Size in bytes.
    pub file_size: u64,
    /// When the download finished.
    pub downloaded_at: DateTime<Utc>,
    /// Application surface the artifact was found on.
    pub application_type: String,
    /// Human-readable name.
    pub display_name: String,
    /// File name reported by the vendor page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    /// Source URL.
    #[serde(default)]
    pub url: String,
}

impl ArtifactRecord {
    /// Builds a record for a finished download.
    pub fn from_artifact(
        artifact: &CategorizedArtifact,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        file_size: u64,
        downloaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            category: artifact.category,
            version: artifact.version.clone(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            file_size,
            downloaded_at,
            application_type: artifact.application_type.clone(),
            display_name: artifact.display_name.clone(),
            original_filename: artifact.original_filename.clone(),
            url: artifact.url.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
