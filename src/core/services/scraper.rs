//! Browser-driven lyrics scraping
//!
//! Every call launches its own headless Chromium, so sessions are never
//! shared between concurrent resolutions. The browser is used to get past
//! bot checks and client-side rendering; the text itself is pulled out of
//! the rendered HTML with `scraper`.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use chrono::Utc;
use futures::StreamExt;
use scraper::{ElementRef, Html, Node, Selector};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

const PRIMARY_SELECTOR: &str = "[data-lyrics-container]";
const BACKUP_SELECTOR: &str = ".lyric#d_video_summary";
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

// Hide the usual automation fingerprints before any page script runs.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
"#;

const BLOCK_ELEMENTS: &[&str] = &[
    "div", "p", "section", "article", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Primary,
    Backup,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Primary => "primary",
            ProfileKind::Backup => "backup",
        }
    }
}

/// How matched elements become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Lyrics split over several containers, joined with newlines.
    AllMatches,
    /// Lyrics in one container.
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUrl {
    /// The target is already a URL (e.g. taken from search results).
    AsGiven,
    /// The target is substituted for `{song_id}` in the template.
    Template(String),
}

/// Site-specific description of one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeProfile {
    pub kind: ProfileKind,
    pub selector: String,
    pub selector_timeout: Duration,
    pub extraction: Extraction,
    pub url: TargetUrl,
    pub confirms_english: bool,
}

impl ScrapeProfile {
    /// English-translation lyrics site; multi-block layout.
    pub fn primary(selector_timeout: Duration) -> Self {
        Self {
            kind: ProfileKind::Primary,
            selector: PRIMARY_SELECTOR.to_string(),
            selector_timeout,
            extraction: Extraction::AllMatches,
            url: TargetUrl::AsGiven,
            confirms_english: true,
        }
    }

    /// Original song-catalog page keyed by external song id.
    pub fn backup(url_template: impl Into<String>, selector_timeout: Duration) -> Self {
        Self {
            kind: ProfileKind::Backup,
            selector: BACKUP_SELECTOR.to_string(),
            selector_timeout,
            extraction: Extraction::FirstMatch,
            url: TargetUrl::Template(url_template.into()),
            confirms_english: false,
        }
    }

    pub fn target_url(&self, target: &str) -> String {
        match &self.url {
            TargetUrl::AsGiven => target.to_string(),
            TargetUrl::Template(template) => {
                let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
                template.replace("{song_id}", &encoded)
            }
        }
    }
}

/// Fetches the raw, unnormalized lyrics text for one profile and target.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, profile: &ScrapeProfile, target: &str) -> Result<String, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// `None` skips the selector-timeout screenshot
    pub snapshot_dir: Option<PathBuf>,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(60),
            snapshot_dir: None,
            chrome_executable: None,
        }
    }
}

pub struct BrowserScraper {
    settings: ScrapeSettings,
}

impl BrowserScraper {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        for arg in launch_args(&self.settings) {
            builder = builder.arg(arg);
        }
        if let Some(ref path) = self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(ScrapeError::Launch)
    }

    async fn drive(&self, browser: &Browser, profile: &ScrapeProfile, url: &str) -> Result<String, ScrapeError> {
        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(self.settings.user_agent.clone())).await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT)).await?;

        page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
        let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

        debug!("Navigating to {}", url);
        let navigation = async {
            let navigated = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| e.to_string())?
                .result;
            if let Some(reason) = navigated.error_text.filter(|text| !text.is_empty()) {
                return Err(reason);
            }

            // Events from the blank start page carry a different loader id
            while let Some(event) = lifecycle.next().await {
                let this_document = navigated.loader_id.as_ref().map_or(true, |id| *id == event.loader_id);
                if this_document && is_network_quiet(&event.name) {
                    debug!("Network settled ({}) on {}", event.name, url);
                    return Ok(());
                }
            }
            Err("page closed before the network settled".to_string())
        };
        match timeout(self.settings.navigation_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                return Err(ScrapeError::Navigation { url: url.to_string(), reason });
            }
            Err(_) => {
                return Err(ScrapeError::Navigation { url: url.to_string(), reason: "timed out".to_string() });
            }
        }

        if timeout(profile.selector_timeout, wait_for_selector(&page, &profile.selector)).await.is_err() {
            warn!("Selector '{}' did not appear on {}", profile.selector, url);
            let snapshot = self.capture_snapshot(&page, profile).await;
            return Err(ScrapeError::SelectorTimeout {
                selector: profile.selector.clone(),
                url: url.to_string(),
                snapshot,
            });
        }

        let html = page.content().await?;
        extract_lyrics(&html, profile)
    }

    async fn capture_snapshot(&self, page: &Page, profile: &ScrapeProfile) -> Option<PathBuf> {
        let dir = self.settings.snapshot_dir.as_ref()?;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Cannot create snapshot directory {}: {}", dir.display(), e);
            return None;
        }

        let path = dir.join(format!(
            "{}-{}.png",
            profile.kind.as_str(),
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        let params = ScreenshotParams::builder().full_page(true).build();
        match page.save_screenshot(params, &path).await {
            Ok(_) => {
                info!("Saved diagnostic snapshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to capture diagnostic snapshot: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Scraper for BrowserScraper {
    async fn scrape(&self, profile: &ScrapeProfile, target: &str) -> Result<String, ScrapeError> {
        let url = profile.target_url(target);
        info!("Scraping {} profile: {}", profile.kind.as_str(), url);

        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let outcome = self.drive(&browser, profile, &url).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        events.abort();

        outcome
    }
}

async fn wait_for_selector(page: &Page, selector: &str) {
    loop {
        if let Ok(found) = page.find_elements(selector).await {
            if !found.is_empty() {
                return;
            }
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// Lifecycle events that mean the page has stopped loading resources.
pub fn is_network_quiet(event_name: &str) -> bool {
    matches!(event_name, "networkAlmostIdle" | "networkIdle")
}

/// Chromium flags for a session that does not announce itself as automated.
pub fn launch_args(settings: &ScrapeSettings) -> Vec<String> {
    vec![
        "--disable-setuid-sandbox".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--user-agent={}", settings.user_agent),
    ]
}

/// Pull the visible text of the profile's elements out of rendered HTML.
pub fn extract_lyrics(html: &str, profile: &ScrapeProfile) -> Result<String, ScrapeError> {
    let selector = Selector::parse(&profile.selector).map_err(|e| ScrapeError::Extraction {
        reason: format!("invalid selector '{}': {:?}", profile.selector, e),
    })?;

    let document = Html::parse_document(html);
    let matches: Vec<ElementRef<'_>> = document.select(&selector).collect();
    if matches.is_empty() {
        return Err(ScrapeError::Extraction {
            reason: format!("no element matches '{}'", profile.selector),
        });
    }

    let text = match profile.extraction {
        Extraction::AllMatches => matches.into_iter().map(inner_text).collect::<Vec<_>>().join("\n"),
        Extraction::FirstMatch => inner_text(matches[0]),
    };

    Ok(text)
}

/// Approximates `HTMLElement.innerText`: `<br>` and block boundaries become
/// line breaks, scripts and excluded annotation headers are skipped.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_inner_text(element, &mut out);
    out.trim_end_matches('\n').to_string()
}

fn push_inner_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if matches!(name, "script" | "style" | "noscript")
                    || el.attr("data-exclude-from-selection").is_some()
                {
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    push_inner_text(child_element, out);
                }
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> ScrapeProfile {
        ScrapeProfile::primary(Duration::from_secs(60))
    }

    fn backup() -> ScrapeProfile {
        ScrapeProfile::backup("https://www.melon.com/song/detail.htm?songId={song_id}", Duration::from_secs(20))
    }

    #[test]
    fn test_backup_url_uses_song_id() {
        assert_eq!(
            backup().target_url("30244931"),
            "https://www.melon.com/song/detail.htm?songId=30244931"
        );
    }

    #[test]
    fn test_backup_url_encodes_song_id() {
        assert_eq!(
            backup().target_url("a b&c"),
            "https://www.melon.com/song/detail.htm?songId=a+b%26c"
        );
    }

    #[test]
    fn test_primary_url_is_used_verbatim() {
        let url = "https://genius.com/Genius-english-translations-bts-spring-day-english-translation-lyrics";
        assert_eq!(primary().target_url(url), url);
    }

    #[test]
    fn test_profiles_carry_confirmation_semantics() {
        assert!(primary().confirms_english);
        assert!(!backup().confirms_english);
        assert_eq!(primary().extraction, Extraction::AllMatches);
        assert_eq!(backup().extraction, Extraction::FirstMatch);
    }

    #[test]
    fn test_extract_joins_all_primary_containers() {
        let html = r#"
            <html><body>
              <div data-lyrics-container="true">
                <div data-exclude-from-selection="true">12 Contributors</div>
                [Verse 1]<br>I miss you<br><a href="/x"><span>Saying this</span></a>, I miss you more
              </div>
              <div class="ad">ignored</div>
              <div data-lyrics-container="true">[Chorus]<br>Spring day</div>
            </body></html>
        "#;

        let text = extract_lyrics(html, &primary()).unwrap();
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert!(!text.contains("Contributors"));
        assert!(!text.contains("ignored"));
        assert!(lines.contains(&"[Verse 1]"));
        assert!(lines.contains(&"I miss you"));
        assert!(lines.contains(&"Saying this, I miss you more"));
        assert_eq!(lines.last(), Some(&"Spring day"));
    }

    #[test]
    fn test_extract_takes_single_backup_block() {
        let html = r#"
            <div class="lyric" id="d_video_summary"><!-- height:auto; -->
              첫 줄<br>
              둘째 줄<br>
            </div>
            <div class="lyric" id="other">not this</div>
        "#;

        let text = extract_lyrics(html, &backup()).unwrap();
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["첫 줄", "둘째 줄"]);
    }

    #[test]
    fn test_extract_without_match_fails() {
        let err = extract_lyrics("<html><body><p>nothing</p></body></html>", &primary()).unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { .. }));
    }

    #[test]
    fn test_extract_output_normalizes_cleanly() {
        let html = r#"<div data-lyrics-container="true">Hello<br>, world<br>[Chorus]<br>la</div>"#;
        let raw = extract_lyrics(html, &primary()).unwrap();
        assert_eq!(crate::core::lyrics::normalize(&raw), "Hello, world\n\n[Chorus]\nla");
    }

    #[test]
    fn test_navigation_waits_past_load_for_network_quiet() {
        assert!(is_network_quiet("networkAlmostIdle"));
        assert!(is_network_quiet("networkIdle"));
        assert!(!is_network_quiet("load"));
        assert!(!is_network_quiet("DOMContentLoaded"));
        assert!(!is_network_quiet("firstMeaningfulPaint"));
    }

    #[test]
    fn test_launch_args_hide_automation() {
        let args = launch_args(&ScrapeSettings::default());
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.iter().any(|arg| arg.starts_with("--user-agent=Mozilla/5.0")));
    }

    #[test]
    fn test_browser_config_builds_without_launching() {
        let scraper = BrowserScraper::new(ScrapeSettings {
            chrome_executable: Some(PathBuf::from("/usr/bin/chromium")),
            ..ScrapeSettings::default()
        });
        assert!(scraper.browser_config().is_ok());
    }
}
