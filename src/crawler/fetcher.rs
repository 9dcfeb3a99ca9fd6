//! HTTP fetcher implementation
//!
//! This module handles all static HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and headers
//! - GET requests to fetch page content
//! - Redirect bookkeeping in a cache shared across in-flight fetches
//! - Error classification

use crate::config::CrawlerConfig;
use crate::crawler::parser::extract_title;
use crate::crawler::{FetchedPage, RenderingMethod};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success(FetchedPage),

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// 2xx HTML response with nothing in it
    EmptyBody,
}

impl FetchResult {
    /// Returns true for outcomes that count as a failed URL
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::HttpError { .. } | Self::NetworkError { .. } | Self::EmptyBody
        )
    }
}

/// Map of requested URL to post-redirect URL
///
/// Cloning shares the underlying map. Every fetch in a batch may read it
/// concurrently; writes only ever insert.
#[derive(Debug, Clone, Default)]
pub struct RedirectCache {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl RedirectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `original` resolved to `target`
    pub fn record(&self, original: &str, target: &str) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(original.to_string(), target.to_string());
    }

    /// The post-redirect URL for `original`, if one was observed
    pub fn target_of(&self, original: &str) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(original).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered copy of every recorded redirect
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```
/// use brewcrawl::config::CrawlerConfig;
/// use brewcrawl::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let redirect = if config.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10).min(config.timeout()))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static fetcher with a shared redirect cache
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
    redirects: RedirectCache,
    follow_redirects: bool,
}

impl StaticFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            redirects: RedirectCache::new(),
            follow_redirects: config.follow_redirects,
        })
    }

    pub fn redirects(&self) -> &RedirectCache {
        &self.redirects
    }

    /// Fetches a URL and classifies the outcome
    ///
    /// # Outcomes
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx, HTML, non-empty body | `Success` |
    /// | Non-HTML Content-Type | `ContentMismatch` |
    /// | Non-2xx status | `HttpError` |
    /// | Timeout, connection or body read error | `NetworkError` |
    /// | Blank body | `EmptyBody` |
    ///
    /// When redirects are followed and the final URL differs from `url`, the
    /// pair is recorded in the redirect cache before the status is checked.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                tracing::warn!("Failed to fetch {}: {}", url, error);
                return FetchResult::NetworkError { error };
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let original_url = (final_url != url).then(|| url.to_string());

        if self.follow_redirects && original_url.is_some() {
            tracing::debug!("Redirect recorded: {} -> {}", url, final_url);
            self.redirects.record(url, &final_url);
        }

        if !status.is_success() {
            tracing::warn!("HTTP {} for {}", status.as_u16(), url);
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            tracing::info!("Skipping non-HTML content at {}: {}", url, content_type);
            return FetchResult::ContentMismatch { content_type };
        }

        let response_headers = collect_headers(response.headers());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", url, e);
                return FetchResult::NetworkError {
                    error: e.to_string(),
                };
            }
        };

        if body.trim().is_empty() {
            tracing::warn!("Empty body at {}", url);
            return FetchResult::EmptyBody;
        }

        let title = extract_title(&Html::parse_document(&body));

        FetchResult::Success(FetchedPage {
            url: final_url,
            original_url,
            title,
            html_content: body,
            status_code: status.as_u16(),
            content_type,
            response_headers,
            rendering_method: RenderingMethod::Static,
        })
    }
}

/// Returns true for Content-Types the crawler treats as pages
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

/// Flattens response headers into lowercase names, joining repeats with `, `
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}
