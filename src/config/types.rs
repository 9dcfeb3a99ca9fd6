use crate::links::DiscoveryMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Main configuration structure for a crawl run
///
/// Built once per crawl and never mutated afterwards. Every section falls back
/// to its defaults, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub rendering: RenderConfig,
    #[serde(default)]
    pub js_detection: JsDetectionConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of URLs to visit
    pub max_pages: usize,

    /// Maximum number of concurrent fetches per batch
    pub max_workers: usize,

    /// Delay between batches (milliseconds)
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// User agent sent with every static fetch
    pub user_agent: String,

    /// Follow HTTP redirects and record them in the redirect cache
    pub follow_redirects: bool,

    /// Canonicalize discovered URLs before deduplication
    pub normalize_urls: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_workers: 5,
            request_delay_ms: 1000,
            timeout_secs: 30,
            user_agent: "BrewCrawler/1.0 (Friendly Coffee Bot)".to_string(),
            follow_redirects: true,
            normalize_urls: true,
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// URL acceptance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Accept links whose host differs from the start URL's host
    pub follow_external_links: bool,

    /// Path suffixes that may be crawled; the empty string admits extensionless paths
    pub allowed_extensions: BTreeSet<String>,

    /// Path suffixes that are never crawled; wins over `allowed_extensions`
    pub blocked_extensions: BTreeSet<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            follow_external_links: false,
            allowed_extensions: to_set(&[
                ".html", ".htm", ".php", ".asp", ".aspx", ".jsp", "",
            ]),
            blocked_extensions: to_set(&[
                ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".css", ".js", ".xml", ".zip", ".doc",
                ".docx", ".svg", ".ico",
            ]),
        }
    }
}

/// Per-method link extraction toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    pub anchors: bool,
    pub areas: bool,
    pub forms: bool,
    pub data_attributes: bool,
    pub javascript: bool,
    pub css: bool,
    pub meta: bool,
    pub json_ld: bool,
    pub microdata: bool,
    pub http_headers: bool,
    pub comments: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::all(true)
    }
}

impl ExtractionConfig {
    /// Every method switched to the same value
    pub fn all(enabled: bool) -> Self {
        Self {
            anchors: enabled,
            areas: enabled,
            forms: enabled,
            data_attributes: enabled,
            javascript: enabled,
            css: enabled,
            meta: enabled,
            json_ld: enabled,
            microdata: enabled,
            http_headers: enabled,
            comments: enabled,
        }
    }

    /// Returns whether the given discovery method should run
    pub fn is_enabled(&self, method: DiscoveryMethod) -> bool {
        match method {
            DiscoveryMethod::Anchor => self.anchors,
            DiscoveryMethod::Area => self.areas,
            DiscoveryMethod::Form => self.forms,
            DiscoveryMethod::DataAttribute => self.data_attributes,
            DiscoveryMethod::Javascript => self.javascript,
            DiscoveryMethod::Css => self.css,
            DiscoveryMethod::Meta => self.meta,
            DiscoveryMethod::JsonLd => self.json_ld,
            DiscoveryMethod::Microdata => self.microdata,
            DiscoveryMethod::HttpHeader => self.http_headers,
            DiscoveryMethod::Comment => self.comments,
        }
    }
}

/// Headless-browser fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Render JS-dependent pages in a headless browser
    pub enable_dynamic_rendering: bool,

    /// Navigation timeout (milliseconds)
    pub render_timeout_ms: u64,

    /// CSS selector to wait for after navigation
    pub wait_for_selector: Option<String>,

    /// Wait until the page stops issuing network requests
    pub wait_for_network_idle: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enable_dynamic_rendering: true,
            render_timeout_ms: 30_000,
            wait_for_selector: None,
            wait_for_network_idle: true,
        }
    }
}

impl RenderConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

/// Thresholds for the JS-dependency detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JsDetectionConfig {
    /// Score at which a page is considered JS-dependent
    pub min_score: i32,

    /// Lower score accepted when a strong signal is present
    pub conservative_score: i32,

    /// Raise `min_score` by 15
    pub strict_mode: bool,
}

impl Default for JsDetectionConfig {
    fn default() -> Self {
        Self {
            min_score: 50,
            conservative_score: 35,
            strict_mode: false,
        }
    }
}

pub(crate) fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
