//! Continuous acquisition loop.
//!
//! Each cycle gets a freshly launched browser that is closed afterwards, so a
//! long-running loop never accumulates browser state. Between cycles the
//! loop sleeps for the configured interval or until shutdown.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::context::AcquireContext;
use crate::error::FetchError;
use crate::host::browser::BrowserLauncher;
use crate::pipeline::{CycleReport, pause, run_cycle};
use crate::portal::VendorPortal;
use crate::session::Session;

/// Drives one vendor's cycles.
#[derive(Clone)]
pub struct AcquisitionLoop {
    portal: Arc<dyn VendorPortal>,
    launcher: Arc<dyn BrowserLauncher>,
    ctx: AcquireContext,
}

impl AcquisitionLoop {
    /// Creates a loop.
    pub fn new(
        portal: Arc<dyn VendorPortal>,
        launcher: Arc<dyn BrowserLauncher>,
        ctx: AcquireContext,
    ) -> Self {
        Self {
            portal,
            launcher,
            ctx,
        }
    }

    /// The portal this loop drives.
    pub fn portal(&self) -> &dyn VendorPortal {
        self.portal.as_ref()
    }

    /// Runs a single cycle in a fresh browsing context.
    #[instrument(skip_all, fields(vendor = %self.portal.kind()))]
    pub async fn run_once(&self, shutdown: &CancellationToken) -> Result<CycleReport, FetchError> {
        if shutdown.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let page = self.launcher.launch().await?;
        let mut session = Session::new(page);

        let result = run_cycle(self.portal.as_ref(), &mut session, &self.ctx, shutdown).await;

        session.invalidate();
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        result
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// No cycle failure ends the loop.
    #[instrument(skip_all, fields(vendor = %self.portal.kind()))]
    pub async fn run(&self, shutdown: CancellationToken) {
        let interval = self.ctx.settings.check_interval;
        info!(interval_secs = interval.as_secs(), "Acquisition loop started");

        loop {
            match self.run_once(&shutdown).await {
                Ok(report) => info!(
                    downloaded = report.downloaded(),
                    failed = report.failed(),
                    cancelled = report.cancelled,
                    "Cycle complete"
                ),
                Err(FetchError::Cancelled) => break,
                Err(e) => error!(error = %e, "Cycle failed"),
            }

            if !pause(interval, &shutdown).await {
                break;
            }
        }

        info!("Acquisition loop stopped");
    }
}

impl std::fmt::Debug for AcquisitionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionLoop")
            .field("vendor", &self.portal.kind())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
