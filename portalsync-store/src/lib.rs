// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PortalSync` Store
//!
//! Persistence for the `PortalSync` application.
//!
//! This crate provides:
//!
//! - **`JsonArtifactStore`**: Per-vendor metadata files plus the shared aggregate
//! - **`AppConfig`**: The TOML configuration file
//! - **Persistence**: Atomic JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use portalsync_store::{AppConfig, JsonArtifactStore};
//! use portalsync_core::{ArtifactStore, VendorKind};
//!
//! let config = AppConfig::load_from(&AppConfig::default_path()).await?;
//! let store = JsonArtifactStore::new(config.storage_root());
//!
//! let state = store.load_vendor_state(VendorKind::Bmw).await;
//! println!("{} live artifacts", state.artifacts.len());
//! ```

pub mod artifact_store;
pub mod config;
pub mod error;
pub mod persistence;

pub use artifact_store::{AGGREGATE_FILE, JsonArtifactStore, vendor_metadata_file};
pub use config::{AppConfig, GeneralConfig};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_storage_root, ensure_dir, load_json,
    load_json_or_default, save_json, write_atomic,
};
