//! Version policy.
//!
//! Extracts version tokens from file names and URLs and decides whether a
//! discovered artifact supersedes the recorded one.
//!
//! Acceptance is plain string inequality, not a semantic ordering: vendor
//! version strings are not guaranteed to be ordered tokens, so any change of
//! the token counts as new.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::models::{CategorizedArtifact, UNKNOWN_VERSION, VendorState};

// ============================================================================
// Version Patterns
// ============================================================================

/// A version token shape, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPattern {
    /// `a.b.c.d`
    FourDot,
    /// `a.b.c`
    ThreeDot,
    /// `YYYY-MM-DD`
    IsoDate,
    /// `a-b-c`
    DashNumeric,
    /// `a_b_c_YYYYMMDD`, optionally followed by a region suffix such as `_EU`.
    UnderscoreDate,
}

static PATTERNS: LazyLock<Vec<(VersionPattern, Regex)>> = LazyLock::new(|| {
    [
        (VersionPattern::FourDot, r"\d+\.\d+\.\d+\.\d+"),
        (VersionPattern::ThreeDot, r"\d+\.\d+\.\d+"),
        (VersionPattern::IsoDate, r"\d{4}-\d{2}-\d{2}"),
        (VersionPattern::DashNumeric, r"\d+-\d+-\d+"),
        (
            VersionPattern::UnderscoreDate,
            r"\d+_\d+_\d+_\d{8}(?:_[A-Za-z]{2,4})?",
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("Invalid regex")))
    .collect()
});

/// A trailing file extension containing at least one letter (`.zip`, `.7z`).
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[0-9]*[A-Za-z][A-Za-z0-9]{0,5}$").expect("Invalid regex"));

/// Matches a single input against the ordered patterns.
///
/// A trailing extension is stripped first, so the digit of `.7z` never extends
/// a version. Returns the first pattern that matches together with the token.
pub fn match_version(input: &str) -> Option<(VersionPattern, String)> {
    let stem = EXTENSION
        .find(input)
        .map_or(input, |ext| &input[..ext.start()]);
    PATTERNS.iter().find_map(|(kind, re)| {
        re.find(stem).map(|m| (*kind, m.as_str().to_string()))
    })
}

/// Extracts a version from the resolved file name, falling back to the URL
/// path.
///
/// The host and query of the URL are never searched. Returns
/// [`UNKNOWN_VERSION`] if neither carries a recognizable token.
pub fn extract_version(filename: Option<&str>, url: &str) -> String {
    filename
        .and_then(match_version)
        .or_else(|| match Url::parse(url) {
            Ok(parsed) => match_version(parsed.path()),
            Err(_) => match_version(url),
        })
        .map_or_else(|| UNKNOWN_VERSION.to_string(), |(_, token)| token)
}

// ============================================================================
// Acceptance
// ============================================================================

/// Decides whether `next` supersedes the recorded version `prev`.
///
/// - no previous record: accept
/// - `next` unknown: reject, it cannot be compared
/// - otherwise: accept iff the strings differ
pub fn should_accept(prev: Option<&str>, next: &str) -> bool {
    match prev {
        None => true,
        Some(_) if next == UNKNOWN_VERSION => false,
        Some(prev) => prev != next,
    }
}

/// Filters categorized artifacts down to the ones that should be downloaded.
pub fn select_updates<I>(found: I, state: &VendorState) -> Vec<CategorizedArtifact>
where
    I: IntoIterator<Item = CategorizedArtifact>,
{
    found
        .into_iter()
        .filter(|artifact| {
            should_accept(state.recorded_version(artifact.category), &artifact.version)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
