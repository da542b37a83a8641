//! Application configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [general]
//! storage_root = "/srv/portalsync"
//! check_interval_secs = 21600
//! log_level = "info"
//!
//! [vendors.bmw]
//! username_env = "AOS_USER"
//! password_env = "AOS_PASSWORD"
//!
//! [vendors.mercedes]
//! enabled = false
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use portalsync_core::{VendorKind, VendorSettings};

use crate::error::StoreError;
use crate::persistence::{default_config_path, default_storage_root, write_atomic};

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-vendor sections keyed by CLI name.
    #[serde(default)]
    pub vendors: BTreeMap<String, VendorSettings>,
}

/// The `[general]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Where artifacts and state files live.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    /// Seconds between the start of one cycle's sleep and the next cycle.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Run the browser without a window.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Explicit Chromium binary.
    #[serde(default)]
    pub chromium_path: Option<PathBuf>,
}

fn default_check_interval_secs() -> u64 {
    6 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            check_interval_secs: default_check_interval_secs(),
            log_level: default_log_level(),
            headless: true,
            chromium_path: None,
        }
    }
}

impl AppConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StoreError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let config = Self::from_toml(&text)?;
                info!(path = %path.display(), vendors = config.vendors.len(), "Configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the configuration to `path`.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        let text = self.to_toml()?;
        write_atomic(path, text.as_bytes()).await
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, StoreError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects unknown vendor sections and nonsensical values.
    pub fn validate(&self) -> Result<(), StoreError> {
        for name in self.vendors.keys() {
            if VendorKind::from_cli_name(name).is_none() {
                return Err(StoreError::Config(format!("unknown vendor section: {name}")));
            }
        }
        if self.general.check_interval_secs == 0 {
            return Err(StoreError::Config(
                "general.check_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved storage root.
    pub fn storage_root(&self) -> PathBuf {
        self.general
            .storage_root
            .clone()
            .unwrap_or_else(default_storage_root)
    }

    /// Interval between cycles.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.general.check_interval_secs)
    }

    /// Settings of one vendor; defaults when the section is absent.
    pub fn vendor_settings(&self, kind: VendorKind) -> VendorSettings {
        self.vendors
            .iter()
            .find(|(name, _)| VendorKind::from_cli_name(name) == Some(kind))
            .map(|(_, settings)| settings.clone())
            .unwrap_or_default()
    }

    /// Vendors that have a section with `enabled = true`, in registry order.
    pub fn enabled_vendors(&self) -> Vec<VendorKind> {
        VendorKind::all()
            .iter()
            .copied()
            .filter(|kind| {
                self.vendors
                    .iter()
                    .any(|(name, s)| s.enabled && VendorKind::from_cli_name(name) == Some(*kind))
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
