// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PortalSync` Core
//!
//! Core types, models, and traits for the `PortalSync` application.
//!
//! This crate provides the foundational abstractions used across all other
//! `PortalSync` crates, including:
//!
//! - Domain models (vendors, discovered candidates, artifact records, state)
//! - The version policy that decides whether a discovered artifact is new
//! - Error types
//! - Collaborator traits (artifact store, notifications)
//!
//! ## Key Types
//!
//! ### Vendor Types
//! - [`VendorKind`] - Enum of all supported vendor portals
//! - [`VendorConfig`] - Immutable per-vendor settings resolved at startup
//! - [`ApplicationConfig`] - One application surface of a vendor portal
//!
//! ### Artifact Types
//! - [`Category`] - Semantic bucket holding at most one live artifact
//! - [`CandidateLink`] - A download link found on a page
//! - [`CategorizedArtifact`] - A candidate classified into a category
//! - [`ArtifactRecord`] - A persisted description of a downloaded file
//!
//! ### State
//! - [`VendorState`] - Per-vendor persisted state
//! - [`AggregateState`] - Cross-vendor denormalized state

pub mod error;
pub mod models;
pub mod policy;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Vendor types
    ApplicationConfig,
    CredentialRef,
    Credentials,
    VendorConfig,
    VendorKind,
    VendorSettings,
    // Artifact types
    ArtifactRecord,
    CandidateLink,
    CategorizedArtifact,
    Category,
    DiscoveryMethod,
    UNKNOWN_VERSION,
    // State
    AggregateState,
    SCHEMA_VERSION,
    VendorState,
};

// Re-export policy entry points
pub use policy::{extract_version, select_updates, should_accept};

// Re-export traits
pub use traits::{ArtifactStore, CredentialSource, EnvCredentials, Notifier};
