//! Headless browser host.
//!
//! Vendor portals only work through a real browser: logins are script-driven
//! and download pages are assembled client-side, sometimes inside nested
//! frames. This module abstracts the browser behind [`PortalPage`] and
//! [`BrowserLauncher`] and provides a Chromium implementation via
//! `chromiumoxide`.
//!
//! ## Frames
//!
//! [`PortalPage::documents`] returns the main document plus every nested
//! frame whose document is reachable from the page. Cross-origin frames
//! throw on access and are skipped.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::page::Page;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::error::BrowserError;
use crate::host::http::BROWSER_USER_AGENT;

/// Environment variable overriding Chromium discovery.
pub const CHROMIUM_PATH_ENV: &str = "PORTALSYNC_CHROMIUM_PATH";

// ============================================================================
// Page Abstraction
// ============================================================================

/// HTML of one document on the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageDocument {
    /// Document URL, used to resolve relative links.
    pub url: String,
    /// Serialized document.
    pub html: String,
    /// Frame index path (`/0/1`), `None` for the main document.
    #[serde(default)]
    pub frame_path: Option<String>,
}

impl PageDocument {
    /// Creates the main document.
    pub fn main(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            frame_path: None,
        }
    }

    /// Creates a nested frame document.
    pub fn frame(
        url: impl Into<String>,
        html: impl Into<String>,
        frame_path: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            frame_path: Some(frame_path.into()),
        }
    }

    /// Returns true if this is a nested frame.
    pub fn is_frame(&self) -> bool {
        self.frame_path.is_some()
    }
}

/// One browsing context (tab) driven by the session controller.
#[async_trait]
pub trait PortalPage: Send + Sync {
    /// Navigates and returns the final URL after redirects.
    async fn navigate(&mut self, url: &str) -> Result<String, BrowserError>;

    /// Returns the current address.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Sets the value of the first element matching any selector.
    ///
    /// Returns false if no selector matched.
    async fn fill_first(&mut self, selectors: &[&str], value: &str) -> Result<bool, BrowserError>;

    /// Clicks the first element matching any selector, or submits the form
    /// owning the password field. Returns false if nothing could be submitted.
    async fn submit(&mut self, selectors: &[&str]) -> Result<bool, BrowserError>;

    /// Rendered text of the page body, or of the first element matching `container`.
    async fn visible_text(&self, container: Option<&str>) -> Result<Option<String>, BrowserError>;

    /// Main document plus every reachable nested frame.
    async fn documents(&self) -> Result<Vec<PageDocument>, BrowserError>;

    /// Cookies of the browsing context.
    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError>;

    /// Closes the page and releases the browser behind it.
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Starts fresh browsing contexts.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a new, unauthenticated browsing context.
    async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError>;
}

// ============================================================================
// Cookie
// ============================================================================

/// A browser cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie belongs to.
    pub domain: String,
    /// Path the cookie is valid for.
    pub path: String,
    /// Expiration time, `None` for session cookies.
    pub expires: Option<DateTime<Utc>>,
    /// Whether the cookie requires HTTPS.
    pub secure: bool,
    /// Whether the cookie is HTTP-only.
    pub http_only: bool,
}

impl Cookie {
    /// Creates a session cookie for a domain.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Returns true if the cookie is expired.
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|exp| exp < Utc::now())
    }

    /// Returns true if this cookie would be sent to the given host.
    pub fn matches_domain(&self, host: &str) -> bool {
        let cookie_domain = self.domain.trim_start_matches('.');
        host == cookie_domain || host.ends_with(&format!(".{cookie_domain}"))
    }
}

/// Builds a `Cookie` header value for the given host.
///
/// Expired cookies and cookies of unrelated domains are left out.
pub fn cookie_header(cookies: &[Cookie], host: &str) -> String {
    cookies
        .iter()
        .filter(|c| !c.is_expired() && c.matches_domain(host))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Chromium Discovery
// ============================================================================

/// Finds the Chromium binary.
///
/// Order: [`CHROMIUM_PATH_ENV`], then `google-chrome`, `chromium`,
/// `chromium-browser` on `PATH`, then the default macOS location.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %p, "Configured Chromium path does not exist");
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

// ============================================================================
// Chromium Launcher
// ============================================================================

/// Options for launching Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit binary; discovered with [`find_chromium`] when `None`.
    pub executable: Option<PathBuf>,
    /// Run without a window.
    pub headless: bool,
    /// Upper bound for a single navigation.
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

/// Launches one Chromium process per browsing context.
///
/// Each vendor loop owns its own browser so a recycle cannot disturb
/// another vendor's session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    /// Creates a launcher.
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    #[instrument(skip(self), fields(headless = self.options.headless))]
    async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError> {
        let executable = self
            .options
            .executable
            .clone()
            .or_else(find_chromium)
            .ok_or(BrowserError::NotFound)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if self.options.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "Browser handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        if let Err(e) = page
            .set_user_agent(SetUserAgentOverrideParams::new(BROWSER_USER_AGENT))
            .await
        {
            warn!(error = %e, "Failed to override user agent");
        }

        debug!("Chromium launched");
        Ok(Box::new(ChromiumPage {
            browser,
            page,
            handler,
            navigation_timeout: self.options.navigation_timeout,
        }))
    }
}

// ============================================================================
// Chromium Page
// ============================================================================

/// A Chromium tab together with the browser process that owns it.
pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

/// Collects every same-origin nested frame, depth first.
const FRAMES_SCRIPT: &str = r"(() => {
  const out = [];
  const walk = (win, path) => {
    for (let i = 0; i < win.frames.length; i++) {
      const framePath = path + '/' + i;
      try {
        const frame = win.frames[i];
        const doc = frame.document;
        if (doc && doc.documentElement) {
          out.push({ url: frame.location.href, html: doc.documentElement.outerHTML, frame_path: framePath });
        }
        walk(frame, framePath);
      } catch (e) {
        // cross-origin
      }
    }
  };
  walk(window, '');
  return out;
})()";

impl ChromiumPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::Script(format!("{e:?}")))
    }
}

fn js_literal<T: Serialize + ?Sized>(value: &T) -> Result<String, BrowserError> {
    serde_json::to_string(value).map_err(|e| BrowserError::Script(e.to_string()))
}

#[async_trait]
impl PortalPage for ChromiumPage {
    #[instrument(skip(self), fields(url = %url))]
    async fn navigate(&mut self, url: &str) -> Result<String, BrowserError> {
        let result = tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                if let Err(e) = self.page.wait_for_navigation().await {
                    debug!(error = %e, "Waiting for navigation failed");
                }
                self.current_url().await
            }
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout(self.navigation_timeout)),
        }
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .unwrap_or_default();
        Ok(url)
    }

    async fn fill_first(&mut self, selectors: &[&str], value: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r"((selectors, value) => {{
  for (const sel of selectors) {{
    const el = document.querySelector(sel);
    if (el) {{
      el.focus();
      el.value = value;
      el.dispatchEvent(new Event('input', {{ bubbles: true }}));
      el.dispatchEvent(new Event('change', {{ bubbles: true }}));
      return true;
    }}
  }}
  return false;
}})({}, {})",
            js_literal(selectors)?,
            js_literal(value)?
        );
        self.eval(script).await
    }

    async fn submit(&mut self, selectors: &[&str]) -> Result<bool, BrowserError> {
        let script = format!(
            r"((selectors) => {{
  for (const sel of selectors) {{
    const el = document.querySelector(sel);
    if (el) {{ el.click(); return true; }}
  }}
  const pw = document.querySelector('input[type=password]');
  if (pw && pw.form) {{
    if (pw.form.requestSubmit) {{ pw.form.requestSubmit(); }} else {{ pw.form.submit(); }}
    return true;
  }}
  return false;
}})({})",
            js_literal(selectors)?
        );
        self.eval(script).await
    }

    async fn visible_text(&self, container: Option<&str>) -> Result<Option<String>, BrowserError> {
        let script = format!(
            r"((sel) => {{
  const el = sel ? document.querySelector(sel) : document.body;
  return el ? el.innerText : null;
}})({})",
            js_literal(&container)?
        );
        self.eval(script).await
    }

    async fn documents(&self) -> Result<Vec<PageDocument>, BrowserError> {
        let html = self
            .page
            .content()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        let mut documents = vec![PageDocument::main(self.current_url().await?, html)];

        match self.eval::<Vec<PageDocument>>(FRAMES_SCRIPT.to_string()).await {
            Ok(frames) => documents.extend(frames),
            Err(e) => debug!(error = %e, "Frame enumeration failed"),
        }

        Ok(documents)
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                // CDP reports -1 for session cookies
                expires: (c.expires > 0.0)
                    .then(|| Utc.timestamp_opt(c.expires as i64, 0).single())
                    .flatten(),
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromiumPage {
            mut browser,
            page,
            handler,
            ..
        } = *self;

        if let Err(e) = page.close().await {
            debug!(error = %e, "Closing page failed");
        }
        if let Err(e) = browser.close().await {
            debug!(error = %e, "Closing browser failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "Waiting for browser exit failed");
        }
        handler.abort();
        debug!("Chromium closed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_domain_matching() {
        let cookie = Cookie::new("JSESSIONID", "abc", ".bmwgroup.com");
        assert!(cookie.matches_domain("aos.bmwgroup.com"));
        assert!(cookie.matches_domain("bmwgroup.com"));
        assert!(!cookie.matches_domain("evilbmwgroup.com"));
        assert!(!cookie.matches_domain("example.com"));
    }

    #[test]
    fn test_cookie_header_filters_domain_and_expiry() {
        let mut expired = Cookie::new("old", "1", "aos.bmwgroup.com");
        expired.expires = Some(Utc::now() - chrono::Duration::hours(1));
        let cookies = vec![
            Cookie::new("JSESSIONID", "abc", "aos.bmwgroup.com"),
            Cookie::new("tracking", "x", "ads.example.com"),
            Cookie::new("sso", "def", ".bmwgroup.com"),
            expired,
        ];

        assert_eq!(
            cookie_header(&cookies, "aos.bmwgroup.com"),
            "JSESSIONID=abc; sso=def"
        );
    }

    #[test]
    fn test_page_document_constructors() {
        assert!(!PageDocument::main("https://a", "<html/>").is_frame());
        assert!(PageDocument::frame("https://a/f", "<html/>", "/0").is_frame());
    }

    #[test]
    fn test_frame_document_deserializes_from_script_shape() {
        let json = r#"[{"url":"https://a/f","html":"<html></html>","frame_path":"/0"}]"#;
        let docs: Vec<PageDocument> = serde_json::from_str(json).unwrap();
        assert_eq!(docs[0].frame_path.as_deref(), Some("/0"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_launch_and_navigate() {
        let launcher = ChromiumLauncher::default();
        let mut page = launcher.launch().await.expect("failed to launch");

        let url = page
            .navigate("data:text/html,<h1>Hello</h1><iframe srcdoc='<a href=x>In frame</a>'></iframe>")
            .await
            .expect("navigation failed");
        assert!(url.starts_with("data:"));

        let text = page.visible_text(None).await.unwrap().unwrap_or_default();
        assert!(text.contains("Hello"));

        page.close().await.expect("close failed");
    }
}
