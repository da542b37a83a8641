//! One acquisition cycle of one vendor.
//!
//! ensure-login, then for every application surface in order: re-check the
//! session, discover, categorize, filter to new, and download sequentially.
//! Failures below the cycle level are absorbed into the [`CycleReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use portalsync_core::{ApplicationConfig, ArtifactRecord, Category, VendorKind};

use crate::context::AcquireContext;
use crate::error::FetchError;
use crate::host::browser::Cookie;
use crate::portal::VendorPortal;
use crate::session::Session;
use crate::transfer::TransferManager;

// ============================================================================
// Reports
// ============================================================================

/// A download that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTransfer {
    /// Category of the artifact.
    pub category: Category,
    /// Version that was attempted.
    pub version: String,
    /// Failure reason.
    pub reason: String,
}

/// Outcome of one application surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationReport {
    /// Application id.
    pub application: String,
    /// Categories found on the page.
    pub found: usize,
    /// Artifacts accepted by the version policy.
    pub accepted: usize,
    /// Successful downloads.
    pub downloaded: Vec<ArtifactRecord>,
    /// Failed downloads.
    pub failed: Vec<FailedTransfer>,
    /// Discovery error, if the page could not be scanned.
    pub discovery_error: Option<String>,
}

impl ApplicationReport {
    fn new(application: &str) -> Self {
        Self {
            application: application.to_string(),
            found: 0,
            accepted: 0,
            downloaded: Vec::new(),
            failed: Vec::new(),
            discovery_error: None,
        }
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The vendor.
    pub vendor: VendorKind,
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// When the cycle ended.
    pub finished_at: DateTime<Utc>,
    /// Per-application outcomes, in order.
    pub applications: Vec<ApplicationReport>,
    /// Whether shutdown interrupted the cycle.
    pub cancelled: bool,
}

impl CycleReport {
    /// Total successful downloads.
    pub fn downloaded(&self) -> usize {
        self.applications.iter().map(|a| a.downloaded.len()).sum()
    }

    /// Total failed downloads.
    pub fn failed(&self) -> usize {
        self.applications.iter().map(|a| a.failed.len()).sum()
    }
}

// ============================================================================
// Cycle
// ============================================================================

/// Runs one cycle.
///
/// Returns an error if login fails, if the session is lost and cannot be
/// restored, or if vendor state cannot be persisted. A login failure leaves
/// the vendor state untouched.
#[instrument(skip_all, fields(vendor = %portal.kind()))]
pub async fn run_cycle(
    portal: &dyn VendorPortal,
    session: &mut Session,
    ctx: &AcquireContext,
    shutdown: &CancellationToken,
) -> Result<CycleReport, FetchError> {
    let vendor = portal.kind();
    let started_at = Utc::now();

    portal.login(session, ctx).await?;

    let mut applications = Vec::new();
    let mut cancelled = false;

    for (index, app) in portal.config().applications.iter().enumerate() {
        if index > 0 && !pause(ctx.settings.inter_application_pause, shutdown).await {
            cancelled = true;
            break;
        }
        if shutdown.is_cancelled() {
            cancelled = true;
            break;
        }

        let report = check_application(portal, session, ctx, app).await?;
        info!(
            application = %app.id,
            found = report.found,
            accepted = report.accepted,
            downloaded = report.downloaded.len(),
            failed = report.failed.len(),
            "Application checked"
        );
        applications.push(report);
    }

    let report = CycleReport {
        vendor,
        started_at,
        finished_at: Utc::now(),
        applications,
        cancelled,
    };
    debug!(
        downloaded = report.downloaded(),
        failed = report.failed(),
        cancelled,
        "Cycle finished"
    );
    Ok(report)
}

async fn check_application(
    portal: &dyn VendorPortal,
    session: &mut Session,
    ctx: &AcquireContext,
    app: &ApplicationConfig,
) -> Result<ApplicationReport, FetchError> {
    let vendor = portal.kind();
    let mut report = ApplicationReport::new(&app.id);

    portal.ensure_session(session, ctx).await?;

    let candidates = match portal.discover(session, app, ctx).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(application = %app.id, error = %e, "Discovery failed");
            report.discovery_error = Some(e.to_string());
            Vec::new()
        }
    };

    let found = portal.categorize(&candidates, app);
    report.found = found.len();

    let mut state = ctx.store.load_vendor_state(vendor).await;
    let accepted = portal.check_for_updates(found, &state);
    report.accepted = accepted.len();

    if !accepted.is_empty() {
        let cookies = session_cookies(session).await;
        let transfer = TransferManager::new(ctx, vendor, portal.archive_extension());

        for (index, artifact) in accepted.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(ctx.settings.inter_download_pause).await;
            }
            match transfer.download(ctx, &mut state, artifact, &cookies).await {
                Ok(record) => report.downloaded.push(record),
                Err(e) => {
                    warn!(
                        category = %artifact.category,
                        version = %artifact.version,
                        error = %e,
                        "Download failed"
                    );
                    report.failed.push(FailedTransfer {
                        category: artifact.category,
                        version: artifact.version.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    state.touch(Utc::now());
    let persisted = ctx.store.persist(vendor, &state).await;

    // every downloaded record was already persisted by its transfer
    if !report.downloaded.is_empty() {
        if let Err(e) = ctx.notifier.new_artifacts(vendor, &report.downloaded).await {
            warn!(error = %e, "Failed to deliver new artifact notification");
        }
    }

    persisted?;
    Ok(report)
}

async fn session_cookies(session: &Session) -> Vec<Cookie> {
    match session.page().cookies().await {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!(error = %e, "Failed to read session cookies");
            Vec::new()
        }
    }
}

/// Sleeps unless shutdown is requested first. Returns false on shutdown.
pub(crate) async fn pause(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
