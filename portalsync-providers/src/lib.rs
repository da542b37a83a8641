// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PortalSync` Providers
//!
//! Vendor-specific portal implementations for the `PortalSync` application.
//!
//! Each vendor module includes:
//!
//! - **Descriptor**: Default endpoints, credential variables and application surfaces
//! - **Rules**: Login recipe, discovery markers and category rules
//! - **Portal**: The [`portalsync_fetch::VendorPortal`] implementation
//!
//! ## Supported Vendors
//!
//! | Vendor | Login check | Frames | File name recovery |
//! |--------|-------------|--------|--------------------|
//! | BMW AOS | URL pattern | yes | no |
//! | Mercedes-Benz XENTRY | Identity banner | no | yes |
//!
//! ## Usage
//!
//! ```ignore
//! use portalsync_providers::VendorRegistry;
//! use portalsync_core::{VendorKind, VendorSettings};
//!
//! let desc = VendorRegistry::get(VendorKind::Bmw).unwrap();
//! let portal = desc.portal(&VendorSettings::default())?;
//! ```

pub mod descriptor;
pub mod registry;

// Vendor modules (alphabetical)
pub mod bmw;
pub mod mercedes;


// Re-export key types
pub use descriptor::{PortalDefaults, VendorDescriptor};
pub use registry::VendorRegistry;

pub use bmw::{BmwPortal, bmw_descriptor};
pub use mercedes::{MercedesPortal, mercedes_descriptor};
