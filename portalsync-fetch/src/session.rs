//! Session controller.
//!
//! Owns the login state machine of one vendor:
//!
//! ```text
//! LoggedOut -> Authenticating -> VerifyingSuccess -> LoggedIn | LoginFailed
//! LoggedIn  -> LoggedOut   (liveness check failed, or browser recycled)
//! ```
//!
//! The browsing context lives in an explicitly owned [`Session`]; the
//! controller itself is immutable and only holds the vendor's login recipe.

use regex::Regex;
use std::fmt;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use portalsync_core::{CredentialRef, VendorConfig, VendorKind};

use crate::context::{AcquireContext, AcquireSettings};
use crate::error::{BrowserError, LoginError};
use crate::host::browser::PortalPage;

// ============================================================================
// Login State
// ============================================================================

/// State of a vendor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// No authenticated session.
    LoggedOut,
    /// Credentials are being entered.
    Authenticating,
    /// Credentials were submitted, waiting for confirmation.
    VerifyingSuccess,
    /// The session is authenticated.
    LoggedIn,
    /// The last login attempt failed.
    LoginFailed,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoggedOut => "logged_out",
            Self::Authenticating => "authenticating",
            Self::VerifyingSuccess => "verifying_success",
            Self::LoggedIn => "logged_in",
            Self::LoginFailed => "login_failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One browsing context and its authentication state.
pub struct Session {
    page: Box<dyn PortalPage>,
    state: LoginState,
    last_url: Option<String>,
}

impl Session {
    /// Wraps a freshly launched, unauthenticated page.
    pub fn new(page: Box<dyn PortalPage>) -> Self {
        Self {
            page,
            state: LoginState::LoggedOut,
            last_url: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Returns true if the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state == LoginState::LoggedIn
    }

    /// Last URL observed by the controller.
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// The underlying page.
    pub fn page(&self) -> &dyn PortalPage {
        self.page.as_ref()
    }

    /// The underlying page, mutably.
    pub fn page_mut(&mut self) -> &mut dyn PortalPage {
        self.page.as_mut()
    }

    /// Drops authentication; the next [`SessionController::login`] starts over.
    pub fn invalidate(&mut self) {
        self.transition(LoginState::LoggedOut);
    }

    /// Closes the browsing context.
    pub async fn close(self) -> Result<(), BrowserError> {
        self.page.close().await
    }

    fn transition(&mut self, next: LoginState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Session state change");
            self.state = next;
        }
    }

    async fn observe_url(&mut self) -> Result<String, BrowserError> {
        let url = self.page.current_url().await?;
        self.last_url = Some(url.clone());
        Ok(url)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("last_url", &self.last_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Login Recipe
// ============================================================================

/// Selectors used to find and submit the login form, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// User name input selectors.
    pub username: Vec<&'static str>,
    /// Password input selectors.
    pub password: Vec<&'static str>,
    /// Submit control selectors.
    pub submit: Vec<&'static str>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: vec![
                "input[name='username']",
                "input[name='user']",
                "input[name='login']",
                "input[type='email']",
                "input[id*='user' i]",
                "input[type='text']",
            ],
            password: vec!["input[name='password']", "input[type='password']"],
            submit: vec![
                "button[type='submit']",
                "input[type='submit']",
                "button[name='login']",
            ],
        }
    }
}

/// How a vendor's post-login state is recognized.
#[derive(Debug, Clone)]
pub enum VerificationStrategy {
    /// Wait for the address to match a post-login pattern.
    UrlPattern {
        /// Post-login landing pattern.
        success: Regex,
        /// Authenticated domain, checked when `success` times out.
        domain: Regex,
    },
    /// Poll the rendered text for identity-banner markers.
    ContentMarkers {
        /// Markers that must all be present.
        markers: Vec<String>,
        /// Authenticated-area container, searched when the page body lacks the markers.
        container: Option<String>,
        /// Authenticated domain, checked when the attempts are exhausted.
        domain: Regex,
    },
}

impl VerificationStrategy {
    fn domain(&self) -> &Regex {
        match self {
            Self::UrlPattern { domain, .. } | Self::ContentMarkers { domain, .. } => domain,
        }
    }
}

// ============================================================================
// Session Controller
// ============================================================================

/// Login state machine of one vendor.
#[derive(Debug, Clone)]
pub struct SessionController {
    vendor: VendorKind,
    login_url: String,
    credentials: CredentialRef,
    form: LoginForm,
    strategy: VerificationStrategy,
    login_page: Option<Regex>,
}

impl SessionController {
    /// Creates a controller for a vendor.
    pub fn new(config: &VendorConfig, form: LoginForm, strategy: VerificationStrategy) -> Self {
        Self {
            vendor: config.kind,
            login_url: config.login_url.clone(),
            credentials: config.credentials.clone(),
            form,
            strategy,
            login_page: None,
        }
    }

    /// Treats addresses matching `pattern` as the identity provider's login page,
    /// even when they lie inside the authenticated domain.
    pub fn with_login_page(mut self, pattern: Regex) -> Self {
        self.login_page = Some(pattern);
        self
    }

    /// The verification strategy.
    pub fn strategy(&self) -> &VerificationStrategy {
        &self.strategy
    }

    /// Logs in unless the session already is.
    ///
    /// A failure moves the session to [`LoginState::LoginFailed`] and emits
    /// exactly one login-failure event.
    #[instrument(skip(self, session, ctx), fields(vendor = %self.vendor))]
    pub async fn login(
        &self,
        session: &mut Session,
        ctx: &AcquireContext,
    ) -> Result<(), LoginError> {
        if session.is_authenticated() {
            return Ok(());
        }

        match self.attempt(session, ctx).await {
            Ok(()) => {
                session.transition(LoginState::LoggedIn);
                info!(url = session.last_url().unwrap_or_default(), "Logged in");
                Ok(())
            }
            Err(e) => {
                session.transition(LoginState::LoginFailed);
                let reason = match session.last_url() {
                    Some(url) if e.last_url().is_none() => format!("{e} (last URL: {url})"),
                    _ => e.to_string(),
                };
                warn!(reason = %reason, "Login failed");
                if let Err(notify_err) = ctx.notifier.login_failure(self.vendor, &reason).await {
                    warn!(error = %notify_err, "Failed to deliver login failure notification");
                }
                Err(e)
            }
        }
    }

    /// Re-checks an authenticated session.
    ///
    /// Returns false if the session is not authenticated or was lost.
    pub async fn check_liveness(&self, session: &mut Session) -> Result<bool, BrowserError> {
        if !session.is_authenticated() {
            return Ok(false);
        }

        let url = session.observe_url().await?;
        if self.is_login_page(&url) {
            return Ok(false);
        }

        match &self.strategy {
            VerificationStrategy::UrlPattern { success, domain } => {
                Ok(success.is_match(&url) || domain.is_match(&url))
            }
            VerificationStrategy::ContentMarkers {
                markers,
                container,
                domain,
            } => Ok(
                markers_present(session.page(), markers, container.as_deref()).await?
                    || domain.is_match(&url),
            ),
        }
    }

    /// Verifies the session and logs in again once if it was lost.
    #[instrument(skip(self, session, ctx), fields(vendor = %self.vendor))]
    pub async fn ensure_logged_in(
        &self,
        session: &mut Session,
        ctx: &AcquireContext,
    ) -> Result<(), LoginError> {
        if session.is_authenticated() {
            match self.check_liveness(session).await {
                Ok(true) => return Ok(()),
                Ok(false) => info!(
                    url = session.last_url().unwrap_or_default(),
                    "Session lost, logging in again"
                ),
                Err(e) => warn!(error = %e, "Liveness check failed, logging in again"),
            }
            session.invalidate();
        }

        self.login(session, ctx).await
    }

    // ------------------------------------------------------------------------
    // Login steps
    // ------------------------------------------------------------------------

    async fn attempt(&self, session: &mut Session, ctx: &AcquireContext) -> Result<(), LoginError> {
        session.transition(LoginState::Authenticating);
        let settings = &ctx.settings;

        let credentials = self
            .credentials
            .resolve_from(ctx.credentials.as_ref())
            .map_err(|e| LoginError::Credentials(e.to_string()))?;

        let url = session.page_mut().navigate(&self.login_url).await?;
        session.last_url = Some(url.clone());
        debug!(url = %url, "Login page loaded");
        sleep(settings.page_settle).await;

        let page = session.page_mut();
        if !page
            .fill_first(&self.form.username, &credentials.username)
            .await?
        {
            return Err(LoginError::FormNotFound { url });
        }

        if !page
            .fill_first(&self.form.password, &credentials.password)
            .await?
        {
            // identifier-first forms only reveal the password after the user name
            if !page.submit(&self.form.submit).await? {
                return Err(LoginError::FormNotFound { url });
            }
            sleep(settings.page_settle).await;
            if !page
                .fill_first(&self.form.password, &credentials.password)
                .await?
            {
                return Err(LoginError::FormNotFound { url });
            }
        }

        if !page.submit(&self.form.submit).await? {
            return Err(LoginError::FormNotFound { url });
        }

        session.transition(LoginState::VerifyingSuccess);
        self.verify(session, settings).await
    }

    async fn verify(
        &self,
        session: &mut Session,
        settings: &AcquireSettings,
    ) -> Result<(), LoginError> {
        match &self.strategy {
            VerificationStrategy::UrlPattern { success, .. } => {
                let deadline = Instant::now() + settings.login_url_timeout;
                loop {
                    let url = session.observe_url().await?;
                    if success.is_match(&url) {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                    sleep(settings.url_poll_interval).await;
                }
                self.domain_fallback(
                    session,
                    format!(
                        "post-login address not reached within {:?}",
                        settings.login_url_timeout
                    ),
                )
                .await
            }
            VerificationStrategy::ContentMarkers {
                markers, container, ..
            } => {
                let attempts = settings.content_attempts.max(1);
                for attempt in 1..=attempts {
                    if markers_present(session.page(), markers, container.as_deref()).await? {
                        session.observe_url().await?;
                        return Ok(());
                    }
                    debug!(attempt, attempts, "Identity markers not visible yet");
                    if attempt < attempts {
                        sleep(settings.content_poll_interval).await;
                    }
                }
                self.domain_fallback(
                    session,
                    format!("identity markers not found after {attempts} attempts"),
                )
                .await
            }
        }
    }

    async fn domain_fallback(&self, session: &mut Session, reason: String) -> Result<(), LoginError> {
        let url = session.observe_url().await?;
        if self.strategy.domain().is_match(&url) && !self.is_login_page(&url) {
            debug!(url = %url, "Accepted login by authenticated domain");
            return Ok(());
        }
        Err(LoginError::NotConfirmed {
            reason,
            last_url: url,
        })
    }

    fn is_login_page(&self, url: &str) -> bool {
        self.login_page.as_ref().is_some_and(|re| re.is_match(url))
    }
}

/// Returns true if every marker appears in the page body or in `container`.
async fn markers_present(
    page: &dyn PortalPage,
    markers: &[String],
    container: Option<&str>,
) -> Result<bool, BrowserError> {
    let contains_all = |text: &str| {
        let text = text.to_lowercase();
        markers.iter().all(|m| text.contains(&m.to_lowercase()))
    };

    if page
        .visible_text(None)
        .await?
        .is_some_and(|text| contains_all(&text))
    {
        return Ok(true);
    }

    match container {
        Some(selector) => Ok(page
            .visible_text(Some(selector))
            .await?
            .is_some_and(|text| contains_all(&text))),
        None => Ok(false),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AcquireContext;
    use crate::testing::{FakePage, MemoryStore, RecordingNotifier, static_credentials};
    use portalsync_core::ApplicationConfig;
    use std::sync::Arc;

    const LOGIN_URL: &str = "https://login.example.test/auth";
    const HOME_URL: &str = "https://portal.example.test/start";
    const USER_ENV: &str = "PS_TEST_USER";
    const PASS_ENV: &str = "PS_TEST_PASS";

    fn config(user_env: &str, pass_env: &str) -> VendorConfig {
        VendorConfig {
            kind: VendorKind::Bmw,
            home_url: HOME_URL.to_string(),
            login_url: LOGIN_URL.to_string(),
            credentials: CredentialRef::new(user_env, pass_env),
            applications: vec![ApplicationConfig {
                id: "ista".to_string(),
                label: "ISTA".to_string(),
                url: "https://portal.example.test/ista".to_string(),
                allow_list: vec!["ISTA".to_string()],
                categories: std::collections::BTreeMap::new(),
            }],
        }
    }

    fn url_controller(user_env: &str, pass_env: &str) -> SessionController {
        SessionController::new(
            &config(user_env, pass_env),
            LoginForm::default(),
            VerificationStrategy::UrlPattern {
                success: Regex::new(r"portal\.example\.test/(start|dashboard)").unwrap(),
                domain: Regex::new(r"example\.test").unwrap(),
            },
        )
        .with_login_page(Regex::new(r"login\.example\.test").unwrap())
    }

    fn marker_controller(user_env: &str, pass_env: &str) -> SessionController {
        SessionController::new(
            &config(user_env, pass_env),
            LoginForm::default(),
            VerificationStrategy::ContentMarkers {
                markers: vec!["Abmelden".to_string(), "Mein Profil".to_string()],
                container: Some("#header".to_string()),
                domain: Regex::new(r"xentry\.example\.test").unwrap(),
            },
        )
    }

    fn context(notifier: Arc<RecordingNotifier>) -> AcquireContext {
        AcquireContext::builder()
            .store(Arc::new(MemoryStore::default()))
            .notifier(notifier)
            .credentials(Arc::new(static_credentials(USER_ENV, PASS_ENV)))
            .settings(AcquireSettings::immediate())
            .storage_root("/tmp/portalsync-test")
            .build()
            .unwrap()
    }

    fn login_page() -> FakePage {
        FakePage::new()
            .with_inputs(&["input[name='username']", "input[type='password']"])
    }

    #[tokio::test]
    async fn test_url_login_success() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        let page = login_page().with_submit_landing(HOME_URL);
        let mut session = Session::new(Box::new(page.clone()));

        url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert_eq!(session.state(), LoginState::LoggedIn);
        assert_eq!(session.last_url(), Some(HOME_URL));
        let filled = page.state().filled.clone();
        assert_eq!(filled[0], ("input[name='username']".to_string(), "mechanic".to_string()));
        assert_eq!(filled[1], ("input[type='password']".to_string(), "hunter2".to_string()));
        assert!(notifier.login_failures().is_empty());
    }

    #[tokio::test]
    async fn test_login_is_noop_when_logged_in() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing(HOME_URL);
        let mut session = Session::new(Box::new(page.clone()));
        let controller = url_controller(USER_ENV, PASS_ENV);

        controller.login(&mut session, &ctx).await.unwrap();
        controller.login(&mut session, &ctx).await.unwrap();

        assert_eq!(page.navigations(), vec![LOGIN_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_url_login_domain_fallback() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing("https://portal.example.test/news");
        let mut session = Session::new(Box::new(page));

        url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_url_login_failure_reports_last_url_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        // credentials rejected: the form stays on the identity provider
        let page = login_page().with_url(LOGIN_URL);
        let mut session = Session::new(Box::new(page));

        let err = url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap_err();

        assert_eq!(session.state(), LoginState::LoginFailed);
        assert_eq!(err.last_url(), Some(LOGIN_URL));
        let failures = notifier.login_failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains(LOGIN_URL));
    }

    #[tokio::test]
    async fn test_missing_form() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        let mut session = Session::new(Box::new(FakePage::new()));

        let err = url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::FormNotFound { .. }));
        assert_eq!(notifier.login_failures().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        let mut session = Session::new(Box::new(login_page()));

        let err = url_controller("PS_UNSET_USER", "PS_UNSET_PASS")
            .login(&mut session, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::Credentials(_)));
        assert_eq!(notifier.login_failures().len(), 1);
    }

    #[tokio::test]
    async fn test_identifier_first_form() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = FakePage::new()
            .with_inputs(&["input[name='username']"])
            .with_revealed_inputs(&["input[type='password']"])
            .with_submit_landing(HOME_URL);
        let mut session = Session::new(Box::new(page.clone()));

        url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert!(session.is_authenticated());
        assert_eq!(page.state().submits, 2);
    }

    #[tokio::test]
    async fn test_content_markers_found_after_polling() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page()
            .with_submit_landing("https://elsewhere.test/home")
            .with_body_texts(&["Laden...", "Laden...", "Willkommen | Mein Profil | Abmelden"]);
        let mut session = Session::new(Box::new(page));

        marker_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_content_markers_in_container() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page()
            .with_submit_landing("https://elsewhere.test/home")
            .with_container_text("Mein Profil Abmelden");
        let mut session = Session::new(Box::new(page));

        marker_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_content_markers_require_both() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        let page = login_page()
            .with_submit_landing("https://elsewhere.test/home")
            .with_body_texts(&["Abmelden"]);
        let mut session = Session::new(Box::new(page));

        let err = marker_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::NotConfirmed { .. }));
        assert_eq!(notifier.login_failures().len(), 1);
    }

    #[tokio::test]
    async fn test_content_markers_domain_fallback() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing("https://xentry.example.test/portal");
        let mut session = Session::new(Box::new(page));

        marker_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();

        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_domain_accepted_marker_session_stays_alive() {
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(notifier.clone());
        let page = login_page().with_submit_landing("https://xentry.example.test/portal");
        let mut session = Session::new(Box::new(page.clone()));
        let controller = marker_controller(USER_ENV, PASS_ENV);

        controller.login(&mut session, &ctx).await.unwrap();

        assert!(controller.check_liveness(&mut session).await.unwrap());
        controller.ensure_logged_in(&mut session, &ctx).await.unwrap();
        assert_eq!(session.state(), LoginState::LoggedIn);
        assert_eq!(page.navigations(), vec![LOGIN_URL.to_string()]);
        assert!(notifier.login_failures().is_empty());
    }

    #[tokio::test]
    async fn test_marker_session_lost_outside_domain() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing("https://xentry.example.test/portal");
        let mut session = Session::new(Box::new(page.clone()));
        let controller = marker_controller(USER_ENV, PASS_ENV);

        controller.login(&mut session, &ctx).await.unwrap();
        page.jump_to(LOGIN_URL);

        assert!(!controller.check_liveness(&mut session).await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_logged_in_relogs_after_session_loss() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing(HOME_URL);
        let mut session = Session::new(Box::new(page.clone()));
        let controller = url_controller(USER_ENV, PASS_ENV);

        controller.login(&mut session, &ctx).await.unwrap();
        controller.ensure_logged_in(&mut session, &ctx).await.unwrap();
        assert_eq!(page.navigations().len(), 1);

        // portal bounced us back to the identity provider
        {
            let mut state = page.state();
            state.url = LOGIN_URL.to_string();
            state.inputs = vec![
                "input[name='username']".to_string(),
                "input[type='password']".to_string(),
            ];
            state.filled.clear();
        }

        controller.ensure_logged_in(&mut session, &ctx).await.unwrap();

        assert!(session.is_authenticated());
        assert_eq!(page.navigations().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_resets_state() {
        let ctx = context(Arc::new(RecordingNotifier::default()));
        let page = login_page().with_submit_landing(HOME_URL);
        let mut session = Session::new(Box::new(page));

        url_controller(USER_ENV, PASS_ENV)
            .login(&mut session, &ctx)
            .await
            .unwrap();
        session.invalidate();

        assert_eq!(session.state(), LoginState::LoggedOut);
    }
}
