//! Mercedes-Benz portal implementation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use portalsync_core::{
    ApplicationConfig, CandidateLink, CategorizedArtifact, Category, DiscoveryMethod, VendorConfig,
    VendorKind,
};
use portalsync_fetch::{
    AcquireContext, DiscoveryError, DiscoveryRules, LoginError, Session, SessionController,
    VendorPortal, categorize, discover, discovery::recover_filename,
};

use super::rules::{
    ARCHIVE_EXTENSION, CATEGORY_RULES, discovery_rules, login_form, login_page, verification,
};

/// The Mercedes-Benz XENTRY portal.
#[derive(Debug, Clone)]
pub struct MercedesPortal {
    config: VendorConfig,
    controller: SessionController,
    rules: DiscoveryRules,
}

impl MercedesPortal {
    /// Creates the portal from a resolved configuration.
    pub fn new(config: VendorConfig) -> Self {
        let controller = SessionController::new(&config, login_form(), verification())
            .with_login_page(login_page());
        Self {
            config,
            controller,
            rules: discovery_rules(),
        }
    }
}

#[async_trait]
impl VendorPortal for MercedesPortal {
    fn kind(&self) -> VendorKind {
        VendorKind::Mercedes
    }

    fn config(&self) -> &VendorConfig {
        &self.config
    }

    fn archive_extension(&self) -> Option<&'static str> {
        Some(ARCHIVE_EXTENSION)
    }

    async fn login(&self, session: &mut Session, ctx: &AcquireContext) -> Result<(), LoginError> {
        self.controller.login(session, ctx).await
    }

    async fn ensure_session(
        &self,
        session: &mut Session,
        ctx: &AcquireContext,
    ) -> Result<(), LoginError> {
        self.controller.ensure_logged_in(session, ctx).await
    }

    async fn discover(
        &self,
        session: &mut Session,
        app: &ApplicationConfig,
        ctx: &AcquireContext,
    ) -> Result<Vec<CandidateLink>, DiscoveryError> {
        let candidates = discover(session.page_mut(), &app.url, &self.rules, &ctx.settings).await?;
        let buttons = candidates.iter().filter(|c| c.method == DiscoveryMethod::Button).count();
        debug!(
            application = %app.id,
            candidates = candidates.len(),
            buttons,
            "Download center scanned"
        );
        Ok(candidates)
    }

    fn categorize(
        &self,
        candidates: &[CandidateLink],
        app: &ApplicationConfig,
    ) -> BTreeMap<Category, CategorizedArtifact> {
        let labelled: Vec<CandidateLink> = candidates.iter().map(with_file_name).collect();
        categorize(&labelled, app, CATEGORY_RULES, self.rules.recover_filenames)
    }
}

/// Appends the recovered file name to generic button texts such as
/// "Download" so the category rules can see what the button fetches.
fn with_file_name(candidate: &CandidateLink) -> CandidateLink {
    let mut labelled = candidate.clone();
    if let Some(name) = recover_filename(candidate) {
        if !candidate.text.to_lowercase().contains(&name.to_lowercase()) {
            labelled.text = format!("{} {name}", candidate.text).trim().to_string();
        }
    }
    labelled
}
