//! Mercedes-Benz vendor descriptor.

use std::collections::BTreeMap;
use std::sync::Arc;

use portalsync_core::{ApplicationConfig, Category, VendorConfig, VendorKind};
use portalsync_fetch::VendorPortal;

use super::portal::MercedesPortal;
use crate::descriptor::{PortalDefaults, VendorDescriptor};

/// Creates the Mercedes-Benz vendor descriptor.
pub fn mercedes_descriptor() -> VendorDescriptor {
    VendorDescriptor {
        kind: VendorKind::Mercedes,
        defaults: PortalDefaults {
            home_url: "https://xentry.mercedes-benz.com/portal/home",
            login_url: "https://xentry.mercedes-benz.com/portal/login",
            username_env: "PORTALSYNC_MERCEDES_USERNAME",
            password_env: "PORTALSYNC_MERCEDES_PASSWORD",
        },
        aliases: &["xentry", "mb"],
        applications: mercedes_applications,
        build_portal: build_mercedes_portal,
    }
}

fn build_mercedes_portal(config: VendorConfig) -> Arc<dyn VendorPortal> {
    Arc::new(MercedesPortal::new(config))
}

fn mercedes_applications() -> Vec<ApplicationConfig> {
    vec![ApplicationConfig {
        id: "xentry".to_string(),
        label: "XENTRY Diagnosis".to_string(),
        url: "https://xentry.mercedes-benz.com/portal/downloads".to_string(),
        allow_list: ["XENTRY", "Diagnosis", "Download"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        categories: BTreeMap::from([
            (Category::Installer, "XENTRY Diagnosis Installer".to_string()),
            (Category::Update, "XENTRY Diagnosis Update".to_string()),
            (Category::DataArchive, "XENTRY Data Archive".to_string()),
        ]),
    }]
}
