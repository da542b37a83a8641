//! Trait definitions for PortalSync.
//!
//! These are the seams between the acquisition pipeline and its
//! collaborators: where state is persisted, who hears about events and
//! where secrets come from.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::models::{AggregateState, ArtifactRecord, VendorKind, VendorState};

/// Key-value store for vendor and aggregate state.
///
/// Implementations must treat unreadable or missing state as "no prior
/// state" and return the default shape; only writes can fail.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Loads a vendor's state, or an empty state if none is stored.
    async fn load_vendor_state(&self, vendor: VendorKind) -> VendorState;

    /// Durably replaces a vendor's state.
    async fn save_vendor_state(&self, vendor: VendorKind, state: &VendorState)
    -> Result<(), CoreError>;

    /// Loads the aggregate state, or an empty aggregate if none is stored.
    async fn load_aggregate_state(&self) -> AggregateState;

    /// Read-modify-writes the aggregate with a vendor's current state.
    ///
    /// Concurrent calls from different vendors must not lose updates.
    async fn update_aggregate(&self, vendor: VendorKind, state: &VendorState)
    -> Result<(), CoreError>;

    /// Persists a vendor's state and mirrors it into the aggregate.
    async fn persist(&self, vendor: VendorKind, state: &VendorState) -> Result<(), CoreError> {
        self.save_vendor_state(vendor, state).await?;
        self.update_aggregate(vendor, state).await
    }
}

/// Receiver of human-facing events.
///
/// Delivery failures are reported back but must never fail a cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// New artifacts were downloaded for one application surface.
    async fn new_artifacts(
        &self,
        vendor: VendorKind,
        records: &[ArtifactRecord],
    ) -> Result<(), CoreError>;

    /// A login attempt failed.
    async fn login_failure(&self, vendor: VendorKind, reason: &str) -> Result<(), CoreError>;
}

/// Lookup of named secrets, such as the credential variables of a vendor.
pub trait CredentialSource: Send + Sync {
    /// Returns the value of `name`, or `None` if it is unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl CredentialSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
