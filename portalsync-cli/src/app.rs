//! Wiring from configuration to acquisition loops.

use anyhow::{Context, Result, bail};
use std::sync::Arc;

use portalsync_core::VendorKind;
use portalsync_fetch::{
    AcquireContext, AcquireSettings, AcquisitionLoop, ChromiumLauncher, HttpClient, LaunchOptions,
    find_chromium,
};
use portalsync_providers::VendorRegistry;
use portalsync_store::{AppConfig, JsonArtifactStore};

/// Resolves which vendors a command operates on.
///
/// An explicit name selects that vendor even if it is disabled; otherwise
/// every enabled vendor is selected and an empty selection is an error.
pub fn select_vendors(config: &AppConfig, name: Option<&str>) -> Result<Vec<VendorKind>> {
    if let Some(name) = name {
        let desc = VendorRegistry::get_by_cli_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown vendor: {name}"))?;
        return Ok(vec![desc.kind]);
    }

    let vendors = config.enabled_vendors();
    if vendors.is_empty() {
        bail!(
            "no vendors enabled; add a [vendors.<name>] section to the configuration (known: {})",
            VendorRegistry::all()
                .iter()
                .map(|d| d.cli_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(vendors)
}

/// Runtime timings for the given configuration.
pub fn acquire_settings(config: &AppConfig) -> AcquireSettings {
    AcquireSettings::default().with_check_interval(config.check_interval())
}

/// Builds the shared acquisition context.
pub fn build_context(config: &AppConfig) -> Result<AcquireContext> {
    let root = config.storage_root();
    let store = Arc::new(JsonArtifactStore::new(&root));
    let http = Arc::new(HttpClient::new().context("failed to build HTTP client")?);

    let ctx = AcquireContext::builder()
        .http(http)
        .store(store)
        .settings(acquire_settings(config))
        .storage_root(root)
        .build()?;
    Ok(ctx)
}

/// Builds one loop per vendor, all sharing one context.
pub fn build_loops(config: &AppConfig, vendors: &[VendorKind]) -> Result<Vec<AcquisitionLoop>> {
    let ctx = build_context(config)?;
    let launcher = Arc::new(ChromiumLauncher::new(LaunchOptions {
        executable: config.general.chromium_path.clone().or_else(find_chromium),
        headless: config.general.headless,
        navigation_timeout: ctx.settings.navigation_timeout,
    }));

    vendors
        .iter()
        .map(|kind| {
            let desc = VendorRegistry::get(*kind)
                .ok_or_else(|| anyhow::anyhow!("Vendor not registered: {kind}"))?;
            let portal = desc
                .portal(&config.vendor_settings(*kind))
                .with_context(|| format!("invalid configuration for {kind}"))?;
            Ok(AcquisitionLoop::new(portal, launcher.clone(), ctx.clone()))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(text: &str) -> AppConfig {
        AppConfig::from_toml(text).unwrap()
    }

    #[test]
    fn test_no_enabled_vendor_is_an_error() {
        let err = select_vendors(&config("[vendors.bmw]\nenabled = false\n"), None).unwrap_err();
        assert!(err.to_string().contains("no vendors enabled"));
    }

    #[test]
    fn test_explicit_vendor_overrides_enabled() {
        let vendors = select_vendors(&config("[vendors.bmw]\nenabled = false\n"), Some("bmw")).unwrap();
        assert_eq!(vendors, vec![VendorKind::Bmw]);
    }

    #[test]
    fn test_unknown_vendor_name() {
        assert!(select_vendors(&AppConfig::default(), Some("audi")).is_err());
    }

    #[test]
    fn test_enabled_vendors_in_registry_order() {
        let vendors =
            select_vendors(&config("[vendors.mercedes]\n[vendors.bmw]\n"), None).unwrap();
        assert_eq!(vendors, vec![VendorKind::Bmw, VendorKind::Mercedes]);
    }

    #[test]
    fn test_check_interval_from_config() {
        let settings = acquire_settings(&config("[general]\ncheck_interval_secs = 600\n"));
        assert_eq!(settings.check_interval, Duration::from_secs(600));
        assert_eq!(settings.transfer_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_build_loops_one_per_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config("[vendors.bmw]\n[vendors.mercedes]\n");
        cfg.general.storage_root = Some(dir.path().to_path_buf());

        let loops = build_loops(&cfg, &[VendorKind::Bmw, VendorKind::Mercedes]).unwrap();

        let kinds: Vec<_> = loops.iter().map(|l| l.portal().kind()).collect();
        assert_eq!(kinds, vec![VendorKind::Bmw, VendorKind::Mercedes]);
    }
}
