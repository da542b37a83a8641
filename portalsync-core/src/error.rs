//! Core error types for `PortalSync`.

use thiserror::Error;

/// Core error type for `PortalSync` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Vendor not found or not configured.
    #[error("Vendor not found: {0}")]
    VendorNotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A credential reference could not be resolved.
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// Persisting state failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
