//! BMW vendor descriptor.

use std::collections::BTreeMap;
use std::sync::Arc;

use portalsync_core::{ApplicationConfig, Category, VendorConfig, VendorKind};
use portalsync_fetch::VendorPortal;

use super::portal::BmwPortal;
use crate::descriptor::{PortalDefaults, VendorDescriptor};

/// Creates the BMW vendor descriptor.
pub fn bmw_descriptor() -> VendorDescriptor {
    VendorDescriptor {
        kind: VendorKind::Bmw,
        defaults: PortalDefaults {
            home_url: "https://aos.bmwgroup.com/web/oss/start",
            login_url: "https://aos.bmwgroup.com/web/oss/login",
            username_env: "PORTALSYNC_BMW_USERNAME",
            password_env: "PORTALSYNC_BMW_PASSWORD",
        },
        aliases: &["aos", "ista"],
        applications: bmw_applications,
        build_portal: build_bmw_portal,
    }
}

fn build_bmw_portal(config: VendorConfig) -> Arc<dyn VendorPortal> {
    Arc::new(BmwPortal::new(config))
}

/// Default application surfaces.
fn bmw_applications() -> Vec<ApplicationConfig> {
    vec![
        ApplicationConfig {
            id: "ista".to_string(),
            label: "ISTA".to_string(),
            url: "https://aos.bmwgroup.com/web/oss/ista-download".to_string(),
            allow_list: strings(&["ISTA", "Installationsdatei", "Programmierdaten", "Diagnosedaten"]),
            categories: BTreeMap::from([
                (Category::Client, "ISTA Client".to_string()),
                (Category::ProgrammingData, "ISTA Programmierdaten".to_string()),
                (Category::DiagnosticData, "ISTA Diagnosedaten".to_string()),
            ]),
        },
        ApplicationConfig {
            id: "esys".to_string(),
            label: "E-Sys".to_string(),
            url: "https://aos.bmwgroup.com/web/oss/esys-download".to_string(),
            allow_list: strings(&["E-Sys", "ESys", "PSdZData", "Launcher"]),
            categories: BTreeMap::from([
                (Category::PsdzData, "PSdZData".to_string()),
                (Category::Launcher, "E-Sys Launcher".to_string()),
                (Category::Installer, "E-Sys Installer".to_string()),
            ]),
        },
    ]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
