//! Transfer manager.
//!
//! Downloads an accepted artifact into the vendor directory and keeps that
//! directory at one live file per category:
//!
//! 1. resolve a stable file name
//! 2. remove the category's previous file and look-alike stale variants
//! 3. stream the body to `<name>.part` with the session cookies
//! 4. reject empty bodies, rename into place, record and persist

use chrono::Utc;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use portalsync_core::{ArtifactRecord, CategorizedArtifact, Category, VendorKind, VendorState};

use crate::context::AcquireContext;
use crate::error::TransferError;
use crate::host::browser::Cookie;

/// Minimum length of a vendor-reported file name.
const MIN_ORIGINAL_NAME_LEN: usize = 5;

/// Suffix of in-flight transfers.
const PART_SUFFIX: &str = ".part";

/// Suffix of metadata files inside a vendor directory.
const METADATA_SUFFIX: &str = "_metadata.json";

/// Generic names portals show instead of a file name.
const PLACEHOLDER_NAMES: &[&str] = &[
    "download",
    "downloads",
    "datei",
    "file",
    "herunterladen",
    "get",
    "index",
    "unknown",
];

static SESSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i);jsessionid=.*$").expect("Invalid regex"));

static COPY_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\(\d+\)(\.[A-Za-z0-9]+)$").expect("Invalid regex"));

static HAS_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").expect("Invalid regex"));

/// Stripped repeatedly from a stem until nothing changes, in this order.
static STALE_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[_\-]\d{8}(?:_[A-Za-z]{2,4})?$",
        r"[_\-]\d{4}-\d{2}-\d{2}$",
        r"[_\-\s]?v?\d+(?:[._\-]\d+)+$",
        r"[_\-\s]v?\d+$",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

// ============================================================================
// File Names
// ============================================================================

/// Extracts a clean file name from a URL.
///
/// The query and fragment are dropped, the last path segment is
/// percent-decoded, and session and copy-counter suffixes are removed.
/// Returns `None` if the segment does not look like a file name.
pub fn url_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();

    let name = SESSION_SUFFIX.replace(&decoded, "");
    let name = name.trim_end_matches(".download");
    let name = COPY_COUNTER.replace(name, "$1");
    let name = sanitize(name.trim());

    (HAS_EXTENSION.is_match(&name) && !is_placeholder(&name)).then_some(name)
}

/// Resolves the target file name of an artifact.
///
/// Order: vendor-reported name, clean URL name, `<category>_<version><ext>`.
pub fn resolve_filename(artifact: &CategorizedArtifact, archive_ext: Option<&str>) -> String {
    if let Some(original) = artifact.original_filename.as_deref() {
        let original = sanitize(original.trim());
        if original.len() >= MIN_ORIGINAL_NAME_LEN && !is_placeholder(&original) {
            return original;
        }
    }

    if let Some(name) = url_filename(&artifact.url) {
        return name;
    }

    format!(
        "{}_{}{}",
        artifact.category.as_str(),
        sanitize(&artifact.version),
        infer_extension(&artifact.url, archive_ext)
    )
}

/// Infers an extension from substrings of the URL.
pub fn infer_extension(url: &str, archive_ext: Option<&str>) -> String {
    let url = url.to_lowercase();
    if url.contains(".exe") {
        ".exe".to_string()
    } else if url.contains(".zip") {
        ".zip".to_string()
    } else if let Some(ext) = archive_ext.filter(|ext| url.contains(&ext.to_lowercase())) {
        ext.to_string()
    } else {
        ".bin".to_string()
    }
}

/// Normalized `(base, extension)` used to spot stale variants of a file.
///
/// Version and date tokens are stripped from the stem and both parts are
/// lowercased, so `Tool_1.0.0.exe` and `Tool_1.1.0.exe` share a key.
pub fn normalized_key(file_name: &str) -> (String, String) {
    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    };

    let mut base = stem.to_string();
    loop {
        let before = base.len();
        for re in STALE_SUFFIXES.iter() {
            base = re.replace(&base, "").into_owned();
        }
        if base.len() == before {
            break;
        }
    }
    if base.is_empty() {
        base = stem.to_string();
    }

    (base.to_lowercase(), ext.to_lowercase())
}

fn is_placeholder(name: &str) -> bool {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    PLACEHOLDER_NAMES
        .iter()
        .any(|p| stem.eq_ignore_ascii_case(p))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

// ============================================================================
// Transfer Manager
// ============================================================================

/// Downloads artifacts into one vendor's storage directory.
#[derive(Debug, Clone)]
pub struct TransferManager {
    vendor: VendorKind,
    dir: PathBuf,
    archive_ext: Option<&'static str>,
}

impl TransferManager {
    /// Creates a transfer manager for a vendor.
    pub fn new(ctx: &AcquireContext, vendor: VendorKind, archive_ext: Option<&'static str>) -> Self {
        Self {
            vendor,
            dir: ctx.vendor_dir(vendor),
            archive_ext,
        }
    }

    /// The vendor storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Downloads one accepted artifact and records it.
    ///
    /// On failure no record is written for the artifact, neither in `state`
    /// nor in the store, and no file is left behind.
    #[instrument(
        skip(self, ctx, state, artifact, cookies),
        fields(vendor = %self.vendor, category = %artifact.category, version = %artifact.version)
    )]
    pub async fn download(
        &self,
        ctx: &AcquireContext,
        state: &mut VendorState,
        artifact: &CategorizedArtifact,
        cookies: &[Cookie],
    ) -> Result<ArtifactRecord, TransferError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = resolve_filename(artifact, self.archive_ext);
        let dest = self.dir.join(&file_name);
        let part = self.dir.join(format!("{file_name}{PART_SUFFIX}"));

        self.cleanup_old_versions(ctx, state, artifact.category, &file_name)
            .await?;

        info!(file = %file_name, url = %artifact.url, "Downloading");
        let size = match ctx
            .http
            .download_to(&artifact.url, cookies, &part, ctx.settings.transfer_timeout)
            .await
        {
            Ok(size) => size,
            Err(e) => {
                remove_if_exists(&part).await;
                return Err(e.into());
            }
        };

        if size == 0 {
            remove_if_exists(&part).await;
            return Err(TransferError::EmptyFile(file_name));
        }

        tokio::fs::rename(&part, &dest).await?;
        let size = tokio::fs::metadata(&dest).await?.len();

        let now = Utc::now();
        let record = ArtifactRecord::from_artifact(
            artifact,
            file_name,
            dest.display().to_string(),
            size,
            now,
        );
        let previous_update = state.last_update;
        state.upsert(record.clone());
        state.touch(now);
        if let Err(e) = ctx.store.persist(self.vendor, state).await {
            // unrecorded: the category is retried by the next cycle
            state.remove(artifact.category);
            state.last_update = previous_update;
            remove_if_exists(&dest).await;
            return Err(e.into());
        }

        info!(file = %record.file_name, size, "Download complete");
        Ok(record)
    }

    /// Removes superseded files of `category` before `new_name` is written.
    ///
    /// Drops the category's record if its file goes away, then deletes every
    /// other file with the same normalized name. Live files of other
    /// categories, metadata files and in-flight transfers are never touched.
    pub async fn cleanup_old_versions(
        &self,
        ctx: &AcquireContext,
        state: &mut VendorState,
        category: Category,
        new_name: &str,
    ) -> Result<(), TransferError> {
        if let Some(old) = state.record(category).cloned() {
            if old.file_name != new_name {
                if !state.is_live_file_of_other(&old.file_name, category) {
                    remove_file_logged(&self.dir.join(&old.file_name)).await?;
                }
                state.remove(category);
                ctx.store.persist(self.vendor, state).await?;
                debug!(old = %old.file_name, "Dropped superseded record");
            }
        }

        let key = normalized_key(new_name);
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name == new_name
                || name.ends_with(METADATA_SUFFIX)
                || name.ends_with(PART_SUFFIX)
                || state.is_live_file_of_other(&name, category)
            {
                continue;
            }
            if normalized_key(&name) == key {
                remove_file_logged(&entry.path()).await?;
            }
        }

        Ok(())
    }
}

async fn remove_file_logged(path: &Path) -> Result<(), TransferError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Removed stale file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
    }
}
