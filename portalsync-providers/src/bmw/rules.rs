//! BMW discovery and categorization rules.

use regex::Regex;
use std::sync::LazyLock;

use portalsync_core::Category;
use portalsync_fetch::{CategoryRule, DiscoveryRules, LoginForm, VerificationStrategy};

/// Archive extension of BMW data packages.
pub(crate) const ARCHIVE_EXTENSION: &str = ".7z";

/// First matching rule wins, so the data packages are checked before the
/// tools whose names they share.
pub(crate) const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule::new(Category::ProgrammingData, is_programming_data),
    CategoryRule::new(Category::DiagnosticData, is_diagnostic_data),
    CategoryRule::new(Category::PsdzData, is_psdz_data),
    CategoryRule::new(Category::Launcher, is_launcher),
    CategoryRule::new(Category::Client, is_client),
    CategoryRule::new(Category::Installer, is_installer),
];

fn is_programming_data(text: &str, url: &str) -> bool {
    text.contains("programmierdaten")
        || text.contains("programming data")
        || url.contains("programmingdata")
}

fn is_diagnostic_data(text: &str, url: &str) -> bool {
    text.contains("diagnosedaten") || text.contains("diagnostic data") || url.contains("diagnosticdata")
}

fn is_psdz_data(text: &str, url: &str) -> bool {
    text.contains("psdz") || url.contains("psdzdata")
}

fn is_launcher(text: &str, url: &str) -> bool {
    text.contains("launcher") || url.contains("launcher")
}

fn is_client(text: &str, url: &str) -> bool {
    text.contains("client") || (text.contains("installationsdatei") && url.ends_with(".exe"))
}

fn is_installer(text: &str, url: &str) -> bool {
    (text.contains("e-sys") || text.contains("esys"))
        && (text.contains("setup") || text.contains("install") || url.ends_with(".exe"))
}

pub(crate) fn discovery_rules() -> DiscoveryRules {
    DiscoveryRules {
        url_markers: vec!["/downloadservice/"],
        action_markers: vec!["downloadservice"],
        scan_frames: true,
        recover_filenames: false,
    }
}

pub(crate) fn login_form() -> LoginForm {
    LoginForm {
        username: vec![
            "input#username",
            "input[name='j_username']",
            "input[name='username']",
            "input[type='email']",
        ],
        password: vec![
            "input#password",
            "input[name='j_password']",
            "input[type='password']",
        ],
        submit: vec![
            "button#login-submit",
            "button[type='submit']",
            "input[type='submit']",
        ],
    }
}

static LANDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"aos\.bmwgroup\.com/.*(start|dashboard|home)").expect("Invalid regex")
});

static PORTAL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"aos\.bmwgroup\.com").expect("Invalid regex"));

static LOGIN_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(auth|login|logon)").expect("Invalid regex"));

pub(crate) fn verification() -> VerificationStrategy {
    VerificationStrategy::UrlPattern {
        success: LANDING.clone(),
        domain: PORTAL_DOMAIN.clone(),
    }
}

pub(crate) fn login_page() -> Regex {
    LOGIN_PAGE.clone()
}
