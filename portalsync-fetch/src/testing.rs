//! In-memory fakes for driving the pipeline in tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use portalsync_core::{
    AggregateState, ArtifactRecord, ArtifactStore, CoreError, Notifier, VendorKind, VendorState,
};

use crate::error::BrowserError;
use crate::host::browser::{BrowserLauncher, Cookie, PageDocument, PortalPage};

// ============================================================================
// Fake Page
// ============================================================================

/// Scripted browser state shared between a [`FakePage`] and the test.
#[derive(Debug, Default)]
pub struct FakePageState {
    /// Current address.
    pub url: String,
    /// Navigation target to landing URL.
    pub redirects: HashMap<String, String>,
    /// Documents served for a landing URL.
    pub documents: HashMap<String, Vec<PageDocument>>,
    /// Body texts returned in order; the last one repeats.
    pub body_texts: VecDeque<String>,
    /// Text of the authenticated-area container.
    pub container_text: Option<String>,
    /// Selectors of the inputs currently on the page.
    pub inputs: Vec<String>,
    /// Inputs that appear after the first submit.
    pub revealed_inputs: Vec<String>,
    /// Values filled so far, as `(selector, value)`.
    pub filled: Vec<(String, String)>,
    /// Where the page lands once user name and password were submitted.
    pub submit_lands_on: Option<String>,
    /// Number of submits.
    pub submits: usize,
    /// Every navigation target, in order.
    pub navigations: Vec<String>,
    /// Cookies of the context.
    pub cookies: Vec<Cookie>,
    /// Fail every navigation.
    pub fail_navigation: bool,
    /// Set once the page was closed.
    pub closed: bool,
}

/// Scripted [`PortalPage`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakePageState>>,
}

impl FakePage {
    /// Creates a blank page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the shared state.
    pub fn state(&self) -> MutexGuard<'_, FakePageState> {
        self.state.lock().unwrap()
    }

    /// Starts at `url`.
    pub fn with_url(self, url: &str) -> Self {
        self.state().url = url.to_string();
        self
    }

    /// Lands on `to` when navigating to `from`.
    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.state().redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Serves `documents` while on `url`.
    pub fn with_documents(self, url: &str, documents: Vec<PageDocument>) -> Self {
        self.state().documents.insert(url.to_string(), documents);
        self
    }

    /// Serves a single main document while on `url`.
    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_documents(url, vec![PageDocument::main(url, html)])
    }

    /// Puts inputs matching `selectors` on the page.
    pub fn with_inputs(self, selectors: &[&str]) -> Self {
        self.state()
            .inputs
            .extend(selectors.iter().map(ToString::to_string));
        self
    }

    /// Reveals inputs after the first submit.
    pub fn with_revealed_inputs(self, selectors: &[&str]) -> Self {
        self.state()
            .revealed_inputs
            .extend(selectors.iter().map(ToString::to_string));
        self
    }

    /// Lands on `url` once the credentials were submitted.
    pub fn with_submit_landing(self, url: &str) -> Self {
        self.state().submit_lands_on = Some(url.to_string());
        self
    }

    /// Returns these body texts in order.
    pub fn with_body_texts(self, texts: &[&str]) -> Self {
        self.state()
            .body_texts
            .extend(texts.iter().map(ToString::to_string));
        self
    }

    /// Sets the container text.
    pub fn with_container_text(self, text: &str) -> Self {
        self.state().container_text = Some(text.to_string());
        self
    }

    /// Adds cookies.
    pub fn with_cookies(self, cookies: Vec<Cookie>) -> Self {
        self.state().cookies.extend(cookies);
        self
    }

    /// Moves the page to `url`, as if the portal redirected by itself.
    pub fn jump_to(&self, url: &str) {
        self.state().url = url.to_string();
    }

    /// Navigation targets so far.
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    /// Returns true if the page was closed.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl PortalPage for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<String, BrowserError> {
        let mut state = self.state();
        state.navigations.push(url.to_string());
        if state.fail_navigation {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let landing = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.url.clone_from(&landing);
        Ok(landing)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.state().url.clone())
    }

    async fn fill_first(&mut self, selectors: &[&str], value: &str) -> Result<bool, BrowserError> {
        let mut state = self.state();
        let Some(found) = selectors
            .iter()
            .find(|sel| state.inputs.iter().any(|input| input == *sel))
        else {
            return Ok(false);
        };
        state.filled.push(((*found).to_string(), value.to_string()));
        Ok(true)
    }

    async fn submit(&mut self, _selectors: &[&str]) -> Result<bool, BrowserError> {
        let mut state = self.state();
        if state.inputs.is_empty() {
            return Ok(false);
        }
        state.submits += 1;
        let revealed = std::mem::take(&mut state.revealed_inputs);
        state.inputs.extend(revealed);
        if state.filled.len() >= 2 {
            if let Some(landing) = state.submit_lands_on.clone() {
                state.url = landing;
                state.inputs.clear();
            }
        }
        Ok(true)
    }

    async fn visible_text(&self, container: Option<&str>) -> Result<Option<String>, BrowserError> {
        let mut state = self.state();
        if container.is_some() {
            return Ok(state.container_text.clone());
        }
        if state.body_texts.len() > 1 {
            return Ok(state.body_texts.pop_front());
        }
        Ok(state.body_texts.front().cloned())
    }

    async fn documents(&self) -> Result<Vec<PageDocument>, BrowserError> {
        let state = self.state();
        Ok(state.documents.get(&state.url).cloned().unwrap_or_else(|| {
            vec![PageDocument::main(
                state.url.clone(),
                "<html><body></body></html>",
            )]
        }))
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        Ok(self.state().cookies.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.state().closed = true;
        Ok(())
    }
}

// ============================================================================
// Fake Launcher
// ============================================================================

/// Launcher handing out scripted pages in order.
#[derive(Debug, Default)]
pub struct FakeLauncher {
    pages: Mutex<VecDeque<FakePage>>,
    launches: AtomicUsize,
    fail: AtomicBool,
}

impl FakeLauncher {
    /// Creates a launcher that hands out `pages`, then blank pages.
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    /// Makes every launch fail.
    pub fn failing() -> Self {
        let launcher = Self::default();
        launcher.fail.store(true, Ordering::SeqCst);
        launcher
    }

    /// Number of launches so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PortalPage>, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(BrowserError::LaunchFailed("scripted failure".to_string()));
        }
        let page = self.pages.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::new(page))
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory [`ArtifactStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    vendors: Mutex<BTreeMap<VendorKind, VendorState>>,
    aggregate: Mutex<AggregateState>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
    save_budget: Mutex<Option<usize>>,
}

impl MemoryStore {
    /// Creates a store pre-seeded with a vendor state.
    pub fn with_state(vendor: VendorKind, state: VendorState) -> Self {
        let store = Self::default();
        store.vendors.lock().unwrap().insert(vendor, state);
        store
    }

    /// Makes every write fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Lets `saves` vendor state saves succeed, then fails every later one.
    pub fn fail_writes_after(&self, saves: usize) {
        *self.save_budget.lock().unwrap() = Some(saves);
    }

    /// Number of successful vendor state saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of a vendor state.
    pub fn snapshot(&self, vendor: VendorKind) -> VendorState {
        self.vendors
            .lock()
            .unwrap()
            .get(&vendor)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn load_vendor_state(&self, vendor: VendorKind) -> VendorState {
        self.snapshot(vendor)
    }

    async fn save_vendor_state(
        &self,
        vendor: VendorKind,
        state: &VendorState,
    ) -> Result<(), CoreError> {
        let over_budget = self
            .save_budget
            .lock()
            .unwrap()
            .is_some_and(|budget| self.saves() >= budget);
        if over_budget || self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("scripted write failure".to_string()));
        }
        self.vendors.lock().unwrap().insert(vendor, state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_aggregate_state(&self) -> AggregateState {
        self.aggregate.lock().unwrap().clone()
    }

    async fn update_aggregate(
        &self,
        vendor: VendorKind,
        state: &VendorState,
    ) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("scripted write failure".to_string()));
        }
        self.aggregate
            .lock()
            .unwrap()
            .apply(vendor, state, chrono::Utc::now());
        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential source answering `user_env` and `pass_env` with fixed values.
pub fn static_credentials(user_env: &str, pass_env: &str) -> BTreeMap<String, String> {
    [
        (user_env.to_string(), "mechanic".to_string()),
        (pass_env.to_string(), "hunter2".to_string()),
    ]
    .into()
}

// ============================================================================
// Recording Notifier
// ============================================================================

/// [`Notifier`] that records every event.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    artifacts: Mutex<Vec<(VendorKind, Vec<ArtifactRecord>)>>,
    login_failures: Mutex<Vec<(VendorKind, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    /// Creates a notifier whose deliveries always fail (after recording).
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    /// Recorded new-artifact events.
    pub fn artifact_events(&self) -> Vec<(VendorKind, Vec<ArtifactRecord>)> {
        self.artifacts.lock().unwrap().clone()
    }

    /// Recorded login failures.
    pub fn login_failures(&self) -> Vec<(VendorKind, String)> {
        self.login_failures.lock().unwrap().clone()
    }

    fn result(&self) -> Result<(), CoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CoreError::Other("scripted delivery failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn new_artifacts(
        &self,
        vendor: VendorKind,
        records: &[ArtifactRecord],
    ) -> Result<(), CoreError> {
        self.artifacts
            .lock()
            .unwrap()
            .push((vendor, records.to_vec()));
        self.result()
    }

    async fn login_failure(&self, vendor: VendorKind, reason: &str) -> Result<(), CoreError> {
        self.login_failures
            .lock()
            .unwrap()
            .push((vendor, reason.to_string()));
        self.result()
    }
}
