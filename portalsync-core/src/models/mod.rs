//! Domain models for PortalSync.
//!
//! ## Submodules
//!
//! - [`vendor`] - Vendor types (VendorKind, VendorConfig, ApplicationConfig)
//! - [`artifact`] - Discovery and download types (Category, CandidateLink, ArtifactRecord)
//! - [`state`] - Persisted state (VendorState, AggregateState)

mod artifact;
mod state;
mod vendor;

pub use artifact::{
    ArtifactRecord, CandidateLink, CategorizedArtifact, Category, DiscoveryMethod, UNKNOWN_VERSION,
};
pub use state::{AggregateState, SCHEMA_VERSION, VendorState};
pub use vendor::{
    ApplicationConfig, CredentialRef, Credentials, VendorConfig, VendorKind, VendorSettings,
};
