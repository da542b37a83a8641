//! Vendor portal capability interface.
//!
//! Each vendor implements [`VendorPortal`]; the generic acquisition loop
//! composes it with a session, the transfer manager and the store.

use async_trait::async_trait;
use std::collections::BTreeMap;

use portalsync_core::{
    ApplicationConfig, CandidateLink, CategorizedArtifact, Category, VendorConfig, VendorKind,
    VendorState, select_updates,
};

use crate::context::AcquireContext;
use crate::error::{DiscoveryError, LoginError};
use crate::session::Session;

/// What the acquisition loop needs from one vendor portal.
#[async_trait]
pub trait VendorPortal: Send + Sync {
    /// The vendor.
    fn kind(&self) -> VendorKind;

    /// Resolved vendor configuration.
    fn config(&self) -> &VendorConfig;

    /// Vendor-specific archive extension used when synthesizing file names.
    fn archive_extension(&self) -> Option<&'static str> {
        None
    }

    /// Logs the session in unless it already is.
    async fn login(&self, session: &mut Session, ctx: &AcquireContext) -> Result<(), LoginError>;

    /// Re-checks the session before navigation and logs in again once if it was lost.
    async fn ensure_session(
        &self,
        session: &mut Session,
        ctx: &AcquireContext,
    ) -> Result<(), LoginError>;

    /// Loads an application surface and returns its download candidates.
    async fn discover(
        &self,
        session: &mut Session,
        app: &ApplicationConfig,
        ctx: &AcquireContext,
    ) -> Result<Vec<CandidateLink>, DiscoveryError>;

    /// Classifies candidates into at most one artifact per category.
    fn categorize(
        &self,
        candidates: &[CandidateLink],
        app: &ApplicationConfig,
    ) -> BTreeMap<Category, CategorizedArtifact>;

    /// Filters categorized artifacts down to the ones to download.
    fn check_for_updates(
        &self,
        found: BTreeMap<Category, CategorizedArtifact>,
        state: &VendorState,
    ) -> Vec<CategorizedArtifact> {
        select_updates(found.into_values(), state)
    }
}
