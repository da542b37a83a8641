//! BMW portal implementation.

use async_trait::async_trait;
use std::collections::BTreeMap;

use portalsync_core::{
    ApplicationConfig, CandidateLink, CategorizedArtifact, Category, VendorConfig, VendorKind,
};
use portalsync_fetch::{
    AcquireContext, DiscoveryError, DiscoveryRules, LoginError, Session, SessionController,
    VendorPortal, categorize, discover,
};

use super::rules::{
    ARCHIVE_EXTENSION, CATEGORY_RULES, discovery_rules, login_form, login_page, verification,
};

/// The BMW AOS portal.
#[derive(Debug, Clone)]
pub struct BmwPortal {
    config: VendorConfig,
    controller: SessionController,
    rules: DiscoveryRules,
}

impl BmwPortal {
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
impl VendorPortal for BmwPortal {
    fn kind(&self) -> VendorKind {
        VendorKind::Bmw
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
        if candidates.is_empty() {
            return Err(DiscoveryError::UnexpectedStructure(format!(
                "no download service links on {}",
                app.url
            )));
        }
        Ok(candidates)
    }

    fn categorize(
        &self,
        candidates: &[CandidateLink],
        app: &ApplicationConfig,
    ) -> BTreeMap<Category, CategorizedArtifact> {
        categorize(candidates, app, CATEGORY_RULES, self.rules.recover_filenames)
    }
}
