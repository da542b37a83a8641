// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PortalSync` Fetch
//!
//! Browser sessions, page discovery, artifact transfers and the acquisition
//! loop for the `PortalSync` application.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::browser`] - Headless browser pages ([`PortalPage`], [`BrowserLauncher`])
//! - [`host::http`] - Streamed downloads that replay session cookies
//!
//! ## Acquisition Pipeline
//!
//! - [`session::SessionController`] - Login state machine and liveness checks
//! - [`discovery`] - Candidate extraction and categorization
//! - [`transfer::TransferManager`] - Downloads with stale-version cleanup
//! - [`portal::VendorPortal`] - Per-vendor capability interface
//! - [`pipeline::run_cycle`] - One full cycle of one vendor
//! - [`scheduler::AcquisitionLoop`] - Cancellable continuous loop
//!
//! ## Example
//!
//! ```ignore
//! use portalsync_fetch::{AcquireContext, AcquisitionLoop, ChromiumLauncher};
//! use tokio_util::sync::CancellationToken;
//!
//! let ctx = AcquireContext::builder()
//!     .store(store)
//!     .storage_root("/srv/portalsync")
//!     .build()?;
//!
//! let acquisition = AcquisitionLoop::new(portal, Arc::new(ChromiumLauncher::default()), ctx);
//! acquisition.run(CancellationToken::new()).await;
//! ```

// Core modules
pub mod context;
pub mod discovery;
pub mod error;
pub mod host;
pub mod notify;
pub mod pipeline;
pub mod portal;
pub mod scheduler;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod testing;

// Re-export key types at crate root

// Errors
pub use error::{BrowserError, DiscoveryError, FetchError, HttpError, LoginError, TransferError};

// Host APIs
pub use host::{
    browser::{
        BrowserLauncher, ChromiumLauncher, Cookie, LaunchOptions, PageDocument, PortalPage,
        find_chromium,
    },
    http::HttpClient,
};

// Pipeline
pub use context::{AcquireContext, AcquireContextBuilder, AcquireSettings};
pub use discovery::{CategoryRule, DiscoveryRules, categorize, discover, extract_candidates};
pub use notify::LogNotifier;
pub use pipeline::{ApplicationReport, CycleReport, FailedTransfer, run_cycle};
pub use portal::VendorPortal;
pub use scheduler::AcquisitionLoop;
pub use session::{LoginForm, LoginState, Session, SessionController, VerificationStrategy};
pub use transfer::TransferManager;
