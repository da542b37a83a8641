//! Discovery and categorization engine.
//!
//! Two stages, both pure over already-loaded documents:
//!
//! 1. [`extract_candidates`] walks every document of the page (main document
//!    and reachable frames) and keeps hyperlinks whose target carries a
//!    vendor URL marker and button-like elements whose inline action carries
//!    a vendor action marker. PDFs never become candidates.
//! 2. [`categorize`] filters candidates by the application's allow-list and
//!    assigns each to the first vendor [`CategoryRule`] that matches. The
//!    first candidate to fill a category keeps it.
//!
//! [`discover`] ties both to a live page.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use tokio::time::sleep;
use tracing::{debug, instrument, trace};
use url::Url;

use portalsync_core::{
    ApplicationConfig, CandidateLink, CategorizedArtifact, Category, DiscoveryMethod,
    extract_version,
};

use crate::context::AcquireSettings;
use crate::error::DiscoveryError;
use crate::host::browser::{PageDocument, PortalPage};
use crate::transfer::url_filename;

/// Ancestor levels kept as context for filename recovery.
const CONTEXT_DEPTH: usize = 5;

/// Extensions recognized when recovering file names from page text.
const FILE_EXTENSIONS: &str = "exe|msi|zip|7z|iso|rar|tar|gz|tgz|bin|img|cab|dmg|pkg";

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid selector"));

static ACTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("button, input[type='button'], input[type='submit'], [onclick]")
        .expect("Invalid selector")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("Invalid regex"));

static SIZED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)([A-Za-z0-9][\w.+\-]*\.(?:{FILE_EXTENSIONS}))\s*\(\s*\d+(?:[.,]\d+)?\s*(?:[KMGT]i?B|Bytes?)\s*\)"
    ))
    .expect("Invalid regex")
});

static BARE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b([A-Za-z0-9][\w.+\-]*\.(?:{FILE_EXTENSIONS}))\b"
    ))
    .expect("Invalid regex")
});

// ============================================================================
// Rules
// ============================================================================

/// Structural markers identifying a vendor's download elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRules {
    /// Lowercase substrings a hyperlink target must contain.
    pub url_markers: Vec<&'static str>,
    /// Lowercase substrings an inline `onclick` action must contain.
    pub action_markers: Vec<&'static str>,
    /// Whether nested frames are scanned.
    pub scan_frames: bool,
    /// Whether file names are recovered from surrounding page text.
    pub recover_filenames: bool,
}

/// One category predicate over the lowercased link text and URL.
#[derive(Clone, Copy)]
pub struct CategoryRule {
    /// Category assigned on a match.
    pub category: Category,
    /// Predicate over `(text, url)`, both lowercase.
    pub matches: fn(&str, &str) -> bool,
}

impl CategoryRule {
    /// Creates a rule.
    pub const fn new(category: Category, matches: fn(&str, &str) -> bool) -> Self {
        Self { category, matches }
    }
}

impl std::fmt::Debug for CategoryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRule")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Loads an application page and extracts its download candidates.
#[instrument(skip(page, rules, settings), fields(url = %url))]
pub async fn discover(
    page: &mut dyn PortalPage,
    url: &str,
    rules: &DiscoveryRules,
    settings: &AcquireSettings,
) -> Result<Vec<CandidateLink>, DiscoveryError> {
    let landed = page.navigate(url).await?;
    sleep(settings.page_settle).await;

    let documents = page.documents().await?;
    if documents.is_empty() {
        return Err(DiscoveryError::UnexpectedStructure(format!(
            "no documents at {landed}"
        )));
    }

    let candidates = extract_candidates(&documents, rules);
    debug!(
        documents = documents.len(),
        candidates = candidates.len(),
        "Page scanned"
    );
    Ok(candidates)
}

/// Extracts download candidates from loaded documents.
pub fn extract_candidates(documents: &[PageDocument], rules: &DiscoveryRules) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for doc in documents {
        if doc.is_frame() && !rules.scan_frames {
            continue;
        }

        let html = Html::parse_document(&doc.html);
        let base = Url::parse(&doc.url).ok();
        let (link_method, button_method) = if doc.is_frame() {
            (DiscoveryMethod::FrameLink, DiscoveryMethod::FrameButton)
        } else {
            (DiscoveryMethod::Link, DiscoveryMethod::Button)
        };

        for el in html.select(&LINK_SELECTOR) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let href_lower = href.to_lowercase();
            if !rules.url_markers.iter().any(|m| href_lower.contains(m)) {
                continue;
            }
            let text = element_text(&el);
            if is_pdf(&text, href) {
                trace!(href, "Skipping PDF");
                continue;
            }
            let url = resolve(base.as_ref(), href);
            if seen.insert((text.clone(), url.clone())) {
                candidates.push(candidate(text, url, link_method, &el));
            }
        }

        if rules.action_markers.is_empty() {
            continue;
        }

        for el in html.select(&ACTION_SELECTOR) {
            let Some(action) = el.value().attr("onclick") else {
                continue;
            };
            let action_lower = action.to_lowercase();
            if !rules.action_markers.iter().any(|m| action_lower.contains(m)) {
                continue;
            }
            let text = button_text(&el);
            let url = action_url(action)
                .map_or_else(|| action.to_string(), |target| resolve(base.as_ref(), target));
            if is_pdf(&text, &url) {
                continue;
            }
            if seen.insert((text.clone(), url.clone())) {
                candidates.push(candidate(text, url, button_method, &el));
            }
        }
    }

    candidates
}

fn candidate(
    text: String,
    url: String,
    method: DiscoveryMethod,
    el: &ElementRef<'_>,
) -> CandidateLink {
    let mut link = CandidateLink::new(text, url, method);
    link.context = context_texts(el);
    link
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn button_text(el: &ElementRef<'_>) -> String {
    let text = element_text(el);
    if !text.is_empty() {
        return text;
    }
    el.value()
        .attr("value")
        .or_else(|| el.value().attr("title"))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Own text followed by the text of up to [`CONTEXT_DEPTH`] ancestors.
fn context_texts(el: &ElementRef<'_>) -> Vec<String> {
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .take(CONTEXT_DEPTH + 1)
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_pdf(text: &str, url: &str) -> bool {
    url.to_lowercase().contains(".pdf") || text.to_lowercase().contains("pdf")
}

/// First quoted argument of an inline action that looks like a path or URL.
fn action_url(action: &str) -> Option<&str> {
    QUOTED
        .captures_iter(action)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .find(|s| s.contains('/') || s.contains('.'))
}

fn resolve(base: Option<&Url>, target: &str) -> String {
    match base.and_then(|b| b.join(target).ok()) {
        Some(url) => url.to_string(),
        None => target.to_string(),
    }
}

// ============================================================================
// Categorization
// ============================================================================

/// Classifies candidates into at most one artifact per category.
pub fn categorize(
    candidates: &[CandidateLink],
    app: &ApplicationConfig,
    rules: &[CategoryRule],
    recover_filenames: bool,
) -> BTreeMap<Category, CategorizedArtifact> {
    let mut found = BTreeMap::new();

    for candidate in candidates {
        if !app.allows(&candidate.text) {
            trace!(text = %candidate.text, "Not on allow-list");
            continue;
        }

        let text = candidate.text.to_lowercase();
        let url = candidate.url.to_lowercase();
        let Some(rule) = rules.iter().find(|rule| (rule.matches)(&text, &url)) else {
            trace!(text = %candidate.text, "No category rule matched");
            continue;
        };

        let category = rule.category;
        if !app.targets(category) || found.contains_key(&category) {
            continue;
        }

        let recovered = if recover_filenames {
            recover_filename(candidate)
        } else {
            None
        };
        let version_source = recovered
            .clone()
            .or_else(|| recover_filenames.then(|| candidate.text.clone()))
            .or_else(|| url_filename(&candidate.url));
        let version = extract_version(version_source.as_deref(), &candidate.url);

        debug!(
            category = %category,
            version = %version,
            text = %candidate.text,
            "Categorized candidate"
        );

        found.insert(
            category,
            CategorizedArtifact {
                category,
                application_type: app.id.clone(),
                display_name: app
                    .label_for(category)
                    .map_or_else(|| candidate.text.clone(), ToString::to_string),
                version,
                original_filename: recovered,
                url: candidate.url.clone(),
                link_text: candidate.text.clone(),
            },
        );
    }

    found
}

/// Recovers the artifact's file name from the text around a candidate.
///
/// Each context level, nearest first, is searched for `<name>.<ext> (size)`
/// and then for a bare `<name>.<ext>`.
pub fn recover_filename(candidate: &CandidateLink) -> Option<String> {
    candidate
        .context
        .iter()
        .find_map(|text| {
            SIZED_FILENAME
                .captures(text)
                .or_else(|| BARE_FILENAME.captures(text))
                .and_then(|c| c.get(1))
        })
        .map(|m| m.as_str().to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    fn download_rules() -> DiscoveryRules {
        DiscoveryRules {
            url_markers: vec!["/downloadservice/"],
            action_markers: vec!["startdownload"],
            scan_frames: true,
            recover_filenames: false,
        }
    }

    fn app(allow: &[&str]) -> ApplicationConfig {
        ApplicationConfig {
            id: "ista".to_string(),
            label: "ISTA".to_string(),
            url: "https://portal.test/ista".to_string(),
            allow_list: allow.iter().map(ToString::to_string).collect(),
            categories: BTreeMap::new(),
        }
    }

    fn is_client(text: &str, url: &str) -> bool {
        text.contains("client") || url.ends_with(".exe")
    }

    fn is_programming(text: &str, url: &str) -> bool {
        text.contains("programmierdaten") || url.contains("programmingdata")
    }

    const RULES: &[CategoryRule] = &[
        CategoryRule::new(Category::ProgrammingData, is_programming),
        CategoryRule::new(Category::Client, is_client),
    ];

    #[test]
    fn test_extracts_marked_links_and_resolves_relative() {
        let html = r#"<html><body>
            <a href="/downloadservice/ISTA_4.45.10.zip">ISTA Client</a>
            <a href="/news">News</a>
            <a href="/downloadservice/manual.pdf">ISTA Handbuch</a>
        </body></html>"#;
        let docs = vec![PageDocument::main("https://portal.test/ista/index", html)];

        let candidates = extract_candidates(&docs, &download_rules());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "ISTA Client");
        assert_eq!(
            candidates[0].url,
            "https://portal.test/downloadservice/ISTA_4.45.10.zip"
        );
        assert_eq!(candidates[0].method, DiscoveryMethod::Link);
    }

    #[test]
    fn test_pdf_text_is_excluded() {
        let html = r#"<a href="/downloadservice/doc?id=1">Release Notes (PDF)</a>"#;
        let docs = vec![PageDocument::main("https://portal.test/", html)];
        assert!(extract_candidates(&docs, &download_rules()).is_empty());
    }

    #[test]
    fn test_frame_documents_are_tagged() {
        let frame = r#"<a href="https://cdn.portal.test/downloadservice/client_1.2.3.exe">Client</a>"#;
        let docs = vec![
            PageDocument::main("https://portal.test/", "<iframe></iframe>"),
            PageDocument::frame("https://portal.test/frame", frame, "/0"),
        ];

        let candidates = extract_candidates(&docs, &download_rules());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].method, DiscoveryMethod::FrameLink);
    }

    #[test]
    fn test_frames_skipped_when_disabled() {
        let frame = r#"<a href="/downloadservice/client.exe">Client</a>"#;
        let docs = vec![PageDocument::frame("https://portal.test/frame", frame, "/0")];
        let rules = DiscoveryRules {
            scan_frames: false,
            ..download_rules()
        };
        assert!(extract_candidates(&docs, &rules).is_empty());
    }

    #[test]
    fn test_button_action_url_is_extracted() {
        let html = r#"<table><tr>
            <td>XENTRY_Installer_2024-03.iso (8,1 GB)</td>
            <td><button onclick="startDownload('/files/get?id=77')">Herunterladen</button></td>
        </tr></table>"#;
        let docs = vec![PageDocument::main("https://xentry.test/updates", html)];

        let candidates = extract_candidates(&docs, &download_rules());

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.method, DiscoveryMethod::Button);
        assert_eq!(c.url, "https://xentry.test/files/get?id=77");
        assert_eq!(c.text, "Herunterladen");
        assert!(c.context.iter().any(|t| t.contains("XENTRY_Installer_2024-03.iso")));
    }

    #[test]
    fn test_button_without_url_keeps_action() {
        let html = r#"<input type="button" value="Download" onclick="startDownload(42)">"#;
        let docs = vec![PageDocument::main("https://xentry.test/", html)];

        let candidates = extract_candidates(&docs, &download_rules());

        assert_eq!(candidates[0].text, "Download");
        assert_eq!(candidates[0].url, "startDownload(42)");
    }

    #[test]
    fn test_categorize_first_match_wins() {
        let candidates = vec![
            CandidateLink::new("ISTA Client", "https://p/downloadservice/client_1.2.3.exe", DiscoveryMethod::Link),
            CandidateLink::new("ISTA Client (alt)", "https://p/downloadservice/client_1.2.2.exe", DiscoveryMethod::Link),
        ];

        let found = categorize(&candidates, &app(&["ISTA"]), RULES, false);

        assert_eq!(found.len(), 1);
        assert_eq!(found[&Category::Client].version, "1.2.3");
    }

    #[test]
    fn test_categorize_priority_prevents_cross_assignment() {
        let candidates = vec![
            CandidateLink::new(
                "ISTA Programmierdaten Client",
                "https://p/downloadservice/ISTAOSS_ProgrammingData_1.2.3.zip",
                DiscoveryMethod::Link,
            ),
            CandidateLink::new(
                "Installationsdatei Client",
                "https://p/downloadservice/client_1.2.3.exe",
                DiscoveryMethod::Link,
            ),
        ];

        let found = categorize(&candidates, &app(&["ISTA", "Client"]), RULES, false);

        assert_eq!(found.len(), 2);
        assert_eq!(found[&Category::ProgrammingData].link_text, "ISTA Programmierdaten Client");
        assert_eq!(found[&Category::Client].link_text, "Installationsdatei Client");
    }

    #[test]
    fn test_categorize_respects_allow_list_and_targets() {
        let candidates = vec![
            CandidateLink::new("Other Tool", "https://p/downloadservice/tool_1.0.0.exe", DiscoveryMethod::Link),
            CandidateLink::new("ISTA Programmierdaten", "https://p/downloadservice/pd.zip", DiscoveryMethod::Link),
        ];
        let mut app = app(&["ISTA"]);
        app.categories.insert(Category::Client, "ISTA Client".to_string());

        let found = categorize(&candidates, &app, RULES, false);

        assert!(found.is_empty());
    }

    #[test]
    fn test_categorize_uses_configured_label() {
        let candidates = vec![CandidateLink::new(
            "ISTA Client",
            "https://p/downloadservice/client_1.2.3.exe",
            DiscoveryMethod::Link,
        )];
        let mut app = app(&["ISTA"]);
        app.categories.insert(Category::Client, "ISTA Installationsdatei".to_string());

        let found = categorize(&candidates, &app, RULES, false);

        assert_eq!(found[&Category::Client].display_name, "ISTA Installationsdatei");
        assert_eq!(found[&Category::Client].application_type, "ista");
    }

    #[test]
    fn test_recover_sized_filename_nearest_first() {
        let mut candidate = CandidateLink::new("Client herunterladen", "https://x/get?id=1", DiscoveryMethod::Button);
        candidate.context = vec![
            "Client herunterladen".to_string(),
            "Client_3.1.0.exe (512 MB) Client herunterladen".to_string(),
            "Data_2024-01-01.iso (8 GB) Client_3.1.0.exe (512 MB)".to_string(),
        ];

        assert_eq!(recover_filename(&candidate).as_deref(), Some("Client_3.1.0.exe"));
    }

    #[test]
    fn test_recover_bare_filename() {
        let mut candidate = CandidateLink::new("Download", "https://x/get?id=1", DiscoveryMethod::Button);
        candidate.context = vec!["Paket: XENTRY_Update_24.3.1.zip".to_string()];
        assert_eq!(recover_filename(&candidate).as_deref(), Some("XENTRY_Update_24.3.1.zip"));
    }

    #[test]
    fn test_recovery_falls_back_to_link_text_for_version() {
        let candidates = vec![CandidateLink::new(
            "ISTA Client 4.46.20",
            "https://x/get?id=1",
            DiscoveryMethod::Button,
        )];

        let found = categorize(&candidates, &app(&["ISTA"]), RULES, true);

        let artifact = &found[&Category::Client];
        assert_eq!(artifact.version, "4.46.20");
        assert!(artifact.original_filename.is_none());
    }

    #[tokio::test]
    async fn test_discover_navigates_and_scans() {
        let html = r#"<a href="/downloadservice/client_1.0.0.exe">ISTA Client</a>"#;
        let mut page = FakePage::new().with_html("https://portal.test/ista", html);

        let candidates = discover(
            &mut page,
            "https://portal.test/ista",
            &download_rules(),
            &AcquireSettings::immediate(),
        )
        .await
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(page.navigations(), vec!["https://portal.test/ista".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_navigation_failure() {
        let mut page = FakePage::new();
        page.state().fail_navigation = true;

        let err = discover(
            &mut page,
            "https://portal.test/ista",
            &download_rules(),
            &AcquireSettings::immediate(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DiscoveryError::PageUnavailable(_)));
    }
}
