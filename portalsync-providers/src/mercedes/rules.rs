//! Mercedes-Benz discovery and categorization rules.

use regex::Regex;
use std::sync::LazyLock;

use portalsync_core::Category;
use portalsync_fetch::{CategoryRule, DiscoveryRules, LoginForm, VerificationStrategy};

/// Archive extension of XENTRY installation media.
pub(crate) const ARCHIVE_EXTENSION: &str = ".iso";

/// Identity banner shown only inside the authenticated area.
const BANNER_MARKERS: [&str; 2] = ["Abmelden", "Mein Konto"];

const BANNER_CONTAINER: &str = "header .user-navigation";

pub(crate) const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule::new(Category::Update, is_update),
    CategoryRule::new(Category::DataArchive, is_data_archive),
    CategoryRule::new(Category::Installer, is_installer),
];

fn is_update(text: &str, url: &str) -> bool {
    text.contains("update") || text.contains("add-on") || url.contains("update")
}

fn is_data_archive(text: &str, url: &str) -> bool {
    text.contains("archiv") || text.contains("daten") || url.contains("dataarchive")
}

fn is_installer(text: &str, url: &str) -> bool {
    text.contains("install")
        || text.contains("setup")
        || text.contains("diagnosis")
        || url.contains(".iso")
}

pub(crate) fn discovery_rules() -> DiscoveryRules {
    DiscoveryRules {
        url_markers: vec!["/download/"],
        action_markers: vec!["download"],
        scan_frames: false,
        recover_filenames: true,
    }
}

pub(crate) fn login_form() -> LoginForm {
    LoginForm {
        username: vec!["input#userid", "input[name='username']", "input[type='text']"],
        password: vec!["input#password", "input[type='password']"],
        submit: vec![
            "button#next-btn",
            "button[type='submit']",
            "input[type='submit']",
        ],
    }
}

static PORTAL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xentry\.mercedes-benz\.com").expect("Invalid regex"));

static LOGIN_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(login|signin|auth)").expect("Invalid regex"));

pub(crate) fn verification() -> VerificationStrategy {
    VerificationStrategy::ContentMarkers {
        markers: BANNER_MARKERS.iter().map(ToString::to_string).collect(),
        container: Some(BANNER_CONTAINER.to_string()),
        domain: PORTAL_DOMAIN.clone(),
    }
}

pub(crate) fn login_page() -> Regex {
    LOGIN_PAGE.clone()
}
