//! HTTP client for direct artifact transfers.
//!
//! Downloads bypass the rendered page: the browser session's cookies are
//! replayed on a plain streamed GET so large archives never pass through
//! the browser.

use futures::StreamExt;
use reqwest::{Client, header};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;
use crate::host::browser::{Cookie, cookie_header};

/// Connect timeout for transfers; the overall bound is set per request.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Desktop browser identity used for both the browser and direct transfers.
///
/// Portals reject unknown clients, and the transfer must look like the same
/// client that owns the session cookies.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and cookie replay.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new() -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { inner })
    }

    /// Streams `url` into `dest`, sending the cookies that match its host.
    ///
    /// Returns the number of bytes written. A non-success status is an error
    /// and leaves `dest` untouched. On a mid-stream failure `dest` may hold a
    /// partial body; the caller owns its cleanup.
    #[instrument(skip(self, cookies, dest), fields(url = %url))]
    pub async fn download_to(
        &self,
        url: &str,
        cookies: &[Cookie],
        dest: &Path,
        timeout: Duration,
    ) -> Result<u64, HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl(format!("{url}: no host")))?;

        let mut request = self
            .inner
            .get(parsed.clone())
            .timeout(timeout)
            .header(header::ACCEPT, "*/*");
        let cookies = cookie_header(cookies, host);
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies);
        }

        debug!("GET request with session cookies");
        let response = request.send().await.map_err(|e| map_timeout(e, timeout))?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_timeout(e, timeout))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        debug!(bytes = written, "Body written");
        Ok(written)
    }
}

fn map_timeout(error: reqwest::Error, timeout: Duration) -> HttpError {
    if error.is_timeout() {
        HttpError::Timeout(timeout)
    } else {
        HttpError::Request(error)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_cookies(server: &MockServer) -> Vec<Cookie> {
        let host = Url::parse(&server.uri())
            .unwrap()
            .host_str()
            .unwrap()
            .to_string();
        vec![
            Cookie::new("JSESSIONID", "abc", host),
            Cookie::new("other", "x", "unrelated.example"),
        ]
    }

    #[tokio::test]
    async fn test_download_streams_body_with_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/client_1.2.3.exe"))
            .and(header_eq("cookie", "JSESSIONID=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("client.part");
        let client = HttpClient::new().unwrap();

        let written = client
            .download_to(
                &format!("{}/files/client_1.2.3.exe", server.uri()),
                &session_cookies(&server),
                &dest,
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_download_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("denied.part");
        let client = HttpClient::new().unwrap();

        let err = client
            .download_to(
                &format!("{}/denied.zip", server.uri()),
                &[],
                &dest,
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Status { status: 403, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_empty_body_writes_zero_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.part");
        let client = HttpClient::new().unwrap();

        let written = client
            .download_to(
                &format!("{}/empty.zip", server.uri()),
                &[],
                &dest,
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_download_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let client = HttpClient::new().unwrap();
        let err = client
            .download_to("not a url", &[], &dir.path().join("x"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }
}
