//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for acquisition operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Browser host failed.
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// HTTP transfer failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Login failed or the session was lost.
    #[error("Login error: {0}")]
    Login(#[from] LoginError),

    /// Page did not look like expected.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Download failed.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Core error (state persistence, configuration).
    #[error("Core error: {0}")]
    Core(#[from] portalsync_core::CoreError),

    /// The loop was asked to stop.
    #[error("Cancelled")]
    Cancelled,
}

// ============================================================================
// Browser Error
// ============================================================================

/// Error type for headless browser operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// No browser binary could be found.
    #[error("Chromium not found: set PORTALSYNC_CHROMIUM_PATH or install chromium")]
    NotFound,

    /// Browser failed to start.
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Navigation failed.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation {
        /// Target URL.
        url: String,
        /// Failure reason.
        reason: String,
    },

    /// Navigation timed out.
    #[error("Navigation timed out after {0:?}")]
    Timeout(Duration),

    /// Script evaluation failed.
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// The page or browser was already closed.
    #[error("Browser session closed")]
    Closed,
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Writing the body to disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Login Error
// ============================================================================

/// Error type for the login state machine.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Credentials could not be resolved.
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// The login form could not be located.
    #[error("Login form not found at {url}")]
    FormNotFound {
        /// Page that was searched.
        url: String,
    },

    /// Post-login state was not recognized.
    #[error("Login not confirmed: {reason} (last URL: {last_url})")]
    NotConfirmed {
        /// Why verification failed.
        reason: String,
        /// Last URL observed in the browser.
        last_url: String,
    },

    /// The session was lost and re-login failed.
    #[error("Session lost and could not be restored: {0}")]
    SessionLost(String),

    /// Browser host failed during login.
    #[error("Browser error during login: {0}")]
    Browser(#[from] BrowserError),
}

impl LoginError {
    /// Last URL observed, if known.
    pub fn last_url(&self) -> Option<&str> {
        match self {
            Self::NotConfirmed { last_url, .. } => Some(last_url),
            Self::FormNotFound { url } => Some(url),
            _ => None,
        }
    }
}

// ============================================================================
// Discovery Error
// ============================================================================

/// Error type for page scanning.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The page could not be loaded.
    #[error("Page unavailable: {0}")]
    PageUnavailable(#[from] BrowserError),

    /// Expected structure was missing.
    #[error("Unexpected page structure: {0}")]
    UnexpectedStructure(String),
}

// ============================================================================
// Transfer Error
// ============================================================================

/// Error type for file transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The HTTP download failed.
    #[error("Download failed: {0}")]
    Http(#[from] HttpError),

    /// The transfer produced no bytes.
    #[error("Downloaded file is empty: {0}")]
    EmptyFile(String),

    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recording the download failed.
    #[error("Failed to record download: {0}")]
    Record(#[from] portalsync_core::CoreError),
}
