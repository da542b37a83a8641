//! Vendor-related types.
//!
//! This module contains types describing the portals we acquire from:
//! - [`VendorKind`] - Enum of supported vendor portals
//! - [`VendorConfig`] - Resolved, immutable per-vendor settings
//! - [`ApplicationConfig`] - One application surface with its allow-list and categories
//! - [`VendorSettings`] - Raw per-vendor overrides as written in the config file

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;
use crate::models::artifact::Category;
use crate::traits::{CredentialSource, EnvCredentials};

// ============================================================================
// Vendor Kind
// ============================================================================

/// Supported vendor portals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKind {
    /// BMW Aftersales Online System (ISTA, E-Sys).
    Bmw,
    /// Mercedes-Benz XENTRY portal.
    Mercedes,
}

impl VendorKind {
    /// Returns the display name for this vendor.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bmw => "BMW AOS",
            Self::Mercedes => "Mercedes-Benz XENTRY",
        }
    }

    /// Returns all available vendor kinds.
    pub fn all() -> &'static [VendorKind] {
        &[Self::Bmw, Self::Mercedes]
    }

    /// Returns the CLI name for this vendor (lowercase, no spaces).
    ///
    /// This is also the name of the vendor's storage directory and the key
    /// used in the aggregate state.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Bmw => "bmw",
            Self::Mercedes => "mercedes",
        }
    }

    /// Looks up a vendor by its CLI name.
    pub fn from_cli_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.cli_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for VendorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Reference to the credentials of a vendor account.
///
/// Only the names of the environment variables are configured; the secrets
/// themselves never appear in configuration or state files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Environment variable holding the user name.
    pub username_env: String,
    /// Environment variable holding the password.
    pub password_env: String,
}

impl CredentialRef {
    /// Creates a credential reference.
    pub fn new(username_env: impl Into<String>, password_env: impl Into<String>) -> Self {
        Self {
            username_env: username_env.into(),
            password_env: password_env.into(),
        }
    }

    /// Reads the referenced credentials from the process environment.
    pub fn resolve(&self) -> Result<Credentials, CoreError> {
        self.resolve_from(&EnvCredentials)
    }

    /// Reads the referenced credentials from `source`.
    ///
    /// Unset and empty values are both reported as missing.
    pub fn resolve_from(&self, source: &dyn CredentialSource) -> Result<Credentials, CoreError> {
        let read = |name: &str| {
            source
                .lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::MissingCredential(name.to_string()))
        };

        Ok(Credentials {
            username: read(&self.username_env)?,
            password: read(&self.password_env)?,
        })
    }
}

/// Resolved account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from literal values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Application Surface
// ============================================================================

/// One application surface of a vendor portal.
///
/// Each surface has its own page, its own allow-list of link texts and its own
/// set of target categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application type identifier (e.g. `ista`), recorded on every artifact.
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// Page that lists the downloads of this application.
    pub url: String,
    /// Case-insensitive substrings; a candidate must match at least one.
    #[serde(default)]
    pub allow_list: Vec<String>,
    /// Target categories and their human-readable labels.
    #[serde(default)]
    pub categories: BTreeMap<Category, String>,
}

impl ApplicationConfig {
    /// Returns true if the visible link text matches the allow-list.
    pub fn allows(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.allow_list
            .iter()
            .any(|entry| !entry.is_empty() && text.contains(&entry.to_lowercase()))
    }

    /// Returns true if this application collects the given category.
    ///
    /// An application without configured categories accepts every category
    /// its vendor's rules can produce.
    pub fn targets(&self, category: Category) -> bool {
        self.categories.is_empty() || self.categories.contains_key(&category)
    }

    /// Returns the configured label for a category.
    pub fn label_for(&self, category: Category) -> Option<&str> {
        self.categories.get(&category).map(String::as_str)
    }
}

// ============================================================================
// Vendor Configuration
// ============================================================================

/// Immutable per-vendor settings, created at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// The vendor.
    pub kind: VendorKind,
    /// Landing page of the authenticated portal.
    pub home_url: String,
    /// Authentication entry point.
    pub login_url: String,
    /// Where to find the account credentials.
    pub credentials: CredentialRef,
    /// Application surfaces, checked in order.
    pub applications: Vec<ApplicationConfig>,
}

impl VendorConfig {
    /// Returns the application surface with the given id.
    pub fn application(&self, id: &str) -> Option<&ApplicationConfig> {
        self.applications.iter().find(|app| app.id == id)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.login_url.is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "{}: login_url must not be empty",
                self.kind
            )));
        }
        if self.applications.is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "{}: at least one application is required",
                self.kind
            )));
        }
        for app in &self.applications {
            if app.allow_list.is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "{}/{}: allow_list must not be empty",
                    self.kind, app.id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Raw Vendor Settings
// ============================================================================

/// Per-vendor section of the configuration file.
///
/// Every field is optional; the vendor descriptor supplies the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSettings {
    /// Whether this vendor is polled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Environment variable holding the user name.
    #[serde(default)]
    pub username_env: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Authentication entry point override.
    #[serde(default)]
    pub login_url: Option<String>,
    /// Portal landing page override.
    #[serde(default)]
    pub home_url: Option<String>,
    /// Application surfaces override.
    #[serde(default)]
    pub applications: Option<Vec<ApplicationConfig>>,
}

fn default_true() -> bool {
    true
}

impl Default for VendorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            username_env: None,
            password_env: None,
            login_url: None,
            home_url: None,
            applications: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
