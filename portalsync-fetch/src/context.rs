//! Acquisition context providing access to host APIs and collaborators.
//!
//! The context is shared by every stage of a cycle: the session controller
//! reads its timings, the transfer manager uses its HTTP client and store,
//! and the loop reports through its notifier.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use portalsync_core::{ArtifactStore, CredentialSource, EnvCredentials, Notifier, VendorKind};

use crate::error::FetchError;
use crate::host::http::HttpClient;
use crate::notify::LogNotifier;

// ============================================================================
// Acquire Settings
// ============================================================================

/// Timings of one acquisition cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireSettings {
    /// Sleep between cycles.
    pub check_interval: Duration,
    /// How long to wait for the post-login URL.
    pub login_url_timeout: Duration,
    /// Poll interval while waiting for the post-login URL.
    pub url_poll_interval: Duration,
    /// Content-marker verification attempts.
    pub content_attempts: u32,
    /// Delay between content-marker attempts.
    pub content_poll_interval: Duration,
    /// Upper bound for a single navigation.
    pub navigation_timeout: Duration,
    /// Wait after navigation for client-side rendering.
    pub page_settle: Duration,
    /// Upper bound for a single artifact transfer.
    pub transfer_timeout: Duration,
    /// Pause between downloads of one application surface.
    pub inter_download_pause: Duration,
    /// Pause between application surfaces.
    pub inter_application_pause: Duration,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(6 * 60 * 60),
            login_url_timeout: Duration::from_secs(30),
            url_poll_interval: Duration::from_millis(500),
            content_attempts: 10,
            content_poll_interval: Duration::from_secs(2),
            navigation_timeout: Duration::from_secs(60),
            page_settle: Duration::from_secs(2),
            transfer_timeout: Duration::from_secs(300),
            inter_download_pause: Duration::from_secs(3),
            inter_application_pause: Duration::from_secs(5),
        }
    }
}

impl AcquireSettings {
    /// Settings with every wait set to zero, for driving cycles in tests.
    pub fn immediate() -> Self {
        Self {
            check_interval: Duration::ZERO,
            login_url_timeout: Duration::ZERO,
            url_poll_interval: Duration::ZERO,
            content_poll_interval: Duration::ZERO,
            page_settle: Duration::ZERO,
            inter_download_pause: Duration::ZERO,
            inter_application_pause: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Sets the cycle interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }
}

// ============================================================================
// Acquire Context
// ============================================================================

/// Context provided to every stage of an acquisition cycle.
#[derive(Clone)]
pub struct AcquireContext {
    /// HTTP client for direct transfers.
    pub http: Arc<HttpClient>,
    /// Persisted vendor and aggregate state.
    pub store: Arc<dyn ArtifactStore>,
    /// Receiver of new-artifact and login-failure events.
    pub notifier: Arc<dyn Notifier>,
    /// Where vendor credentials are read from.
    pub credentials: Arc<dyn CredentialSource>,
    /// Cycle timings.
    pub settings: AcquireSettings,
    /// Root of the per-vendor storage directories.
    pub storage_root: PathBuf,
}

impl AcquireContext {
    /// Creates a builder for the context.
    pub fn builder() -> AcquireContextBuilder {
        AcquireContextBuilder::new()
    }

    /// Directory holding a vendor's artifacts and metadata.
    pub fn vendor_dir(&self, vendor: VendorKind) -> PathBuf {
        self.storage_root.join(vendor.cli_name())
    }

    /// Returns the storage root.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

impl std::fmt::Debug for AcquireContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireContext")
            .field("settings", &self.settings)
            .field("storage_root", &self.storage_root)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Acquire Context Builder
// ============================================================================

/// Builder for constructing an `AcquireContext`.
#[derive(Default)]
pub struct AcquireContextBuilder {
    http: Option<Arc<HttpClient>>,
    store: Option<Arc<dyn ArtifactStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    credentials: Option<Arc<dyn CredentialSource>>,
    settings: AcquireSettings,
    storage_root: Option<PathBuf>,
}

impl AcquireContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the artifact store.
    pub fn store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the notifier. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the credential source. Defaults to [`EnvCredentials`].
    pub fn credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the cycle timings.
    pub fn settings(mut self, settings: AcquireSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the storage root.
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Builds the context.
    ///
    /// A store and a storage root are required.
    pub fn build(self) -> Result<AcquireContext, FetchError> {
        let store = self.store.ok_or_else(|| {
            portalsync_core::CoreError::InvalidConfig("artifact store is required".to_string())
        })?;
        let storage_root = self.storage_root.ok_or_else(|| {
            portalsync_core::CoreError::InvalidConfig("storage root is required".to_string())
        })?;
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::new()?),
        };

        Ok(AcquireContext {
            http,
            store,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(EnvCredentials)),
            settings: self.settings,
            storage_root,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
