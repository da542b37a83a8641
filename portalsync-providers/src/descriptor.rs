//! Vendor descriptor system.
//!
//! A descriptor holds the static knowledge about one vendor portal:
//! - Default endpoints and credential variable names
//! - The default application surfaces
//! - How to build the [`VendorPortal`] from resolved settings

use std::sync::Arc;

use portalsync_core::{
    ApplicationConfig, CoreError, CredentialRef, VendorConfig, VendorKind, VendorSettings,
};
use portalsync_fetch::VendorPortal;

// ============================================================================
// Vendor Descriptor
// ============================================================================

/// Complete descriptor for a vendor.
pub struct VendorDescriptor {
    /// Vendor identifier.
    pub kind: VendorKind,
    /// Endpoint and credential defaults.
    pub defaults: PortalDefaults,
    /// Alternative names accepted on the command line.
    pub aliases: &'static [&'static str],
    /// Default application surfaces.
    pub applications: fn() -> Vec<ApplicationConfig>,
    /// Builds the portal implementation.
    pub build_portal: fn(VendorConfig) -> Arc<dyn VendorPortal>,
}

/// Defaults used when the configuration file omits a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalDefaults {
    /// Landing page of the authenticated portal.
    pub home_url: &'static str,
    /// Authentication entry point.
    pub login_url: &'static str,
    /// Environment variable holding the user name.
    pub username_env: &'static str,
    /// Environment variable holding the password.
    pub password_env: &'static str,
}

impl VendorDescriptor {
    /// Returns the display name.
    pub fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    /// Returns the CLI name.
    pub fn cli_name(&self) -> &'static str {
        self.kind.cli_name()
    }

    /// Merges configured overrides onto the defaults and validates the result.
    pub fn build_config(&self, settings: &VendorSettings) -> Result<VendorConfig, CoreError> {
        let config = VendorConfig {
            kind: self.kind,
            home_url: settings
                .home_url
                .clone()
                .unwrap_or_else(|| self.defaults.home_url.to_string()),
            login_url: settings
                .login_url
                .clone()
                .unwrap_or_else(|| self.defaults.login_url.to_string()),
            credentials: CredentialRef::new(
                settings
                    .username_env
                    .as_deref()
                    .unwrap_or(self.defaults.username_env),
                settings
                    .password_env
                    .as_deref()
                    .unwrap_or(self.defaults.password_env),
            ),
            applications: settings
                .applications
                .clone()
                .unwrap_or_else(self.applications),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds the portal for the given settings.
    pub fn portal(&self, settings: &VendorSettings) -> Result<Arc<dyn VendorPortal>, CoreError> {
        let config = self.build_config(settings)?;
        Ok((self.build_portal)(config))
    }
}

impl std::fmt::Debug for VendorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorDescriptor")
            .field("kind", &self.kind)
            .field("defaults", &self.defaults)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}
