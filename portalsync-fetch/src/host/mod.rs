//! Host APIs for PortalSync acquisition.
//!
//! This module provides abstractions for interacting with external systems:
//!
//! - [`browser`] - Headless browser pages driven by the session controller
//! - [`http`] - Streamed, cookie-authenticated artifact transfers

pub mod browser;
pub mod http;

// Re-export key types
pub use browser::{
    BrowserLauncher, ChromiumLauncher, ChromiumPage, Cookie, LaunchOptions, PageDocument,
    PortalPage, cookie_header, find_chromium,
};
pub use http::{BROWSER_USER_AGENT, HttpClient};
