//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Static HTTP fetching with redirect bookkeeping
//! - Page title and clean-text parsing
//! - The breadth-first frontier
//! - Batch coordination, JS detection and the rendering fallback

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{crawl, crawl_with_renderer, discover_links, CrawlMode, Coordinator};
pub use fetcher::{build_http_client, is_html_content_type, FetchResult, RedirectCache, StaticFetcher};
pub use frontier::Frontier;
pub use parser::{clean_text, extract_title, parse_page, visible_text, ParsedPage, BOILERPLATE_TAGS};

use crate::links::LinkRecord;
use crate::structured::StructuredDataBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How the HTML of a page was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMethod {
    /// Plain HTTP GET
    Static,
    /// Headless-browser render
    Dynamic,
    /// Render was wanted but failed; the static HTML was kept
    StaticFallback,
}

impl fmt::Display for RenderingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::StaticFallback => "static_fallback",
        })
    }
}

/// One successfully fetched HTML page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL after redirects
    pub url: String,
    /// Requested URL, present only when it differs from `url`
    pub original_url: Option<String>,
    pub title: Option<String>,
    pub html_content: String,
    pub status_code: u16,
    pub content_type: String,
    /// Response headers, keyed by lowercase name
    pub response_headers: BTreeMap<String, String>,
    pub rendering_method: RenderingMethod,
}

/// A fetched page plus everything extracted from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    #[serde(flatten)]
    pub page: FetchedPage,
    pub links: Vec<LinkRecord>,
    pub structured_data: StructuredDataBundle,
    /// Readable text with scripts, styles and page chrome removed
    pub clean_text: String,
}

/// Aggregate counters for a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_crawled: usize,
    pub urls_failed: usize,
    pub urls_skipped: usize,
    pub total_unique_links: usize,
    /// `pages_crawled / max(total_unique_links, 1)`; may exceed 1.0
    pub coverage_ratio: f64,
    pub pages_rendered: usize,
    pub render_fallbacks: usize,
}

/// Everything a crawl produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub start_url: String,
    pub base_domain: String,
    pub pages: Vec<CrawledPage>,
    pub visited_urls: BTreeSet<String>,
    pub failed_urls: BTreeSet<String>,
    /// Non-HTML responses; neither crawled nor failed
    pub skipped_urls: BTreeSet<String>,
    pub all_discovered_links: BTreeSet<String>,
    /// Requested URL to post-redirect URL
    pub redirect_cache: BTreeMap<String, String>,
    pub stats: CrawlStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Pages whose clean text or title contains any keyword, ignoring case
    pub fn pages_matching_keywords(&self, keywords: &[&str]) -> Vec<&CrawledPage> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.pages
            .iter()
            .filter(|page| {
                let text = page.clean_text.to_lowercase();
                let title = page.page.title.as_deref().unwrap_or("").to_lowercase();
                keywords
                    .iter()
                    .any(|keyword| text.contains(keyword) || title.contains(keyword))
            })
            .collect()
    }

    /// True when nothing was crawled, e.g. an unreachable start URL
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl CrawlStats {
    pub(crate) fn tally(
        pages: &[CrawledPage],
        failed: usize,
        skipped: usize,
        unique_links: usize,
    ) -> Self {
        let count = |method: RenderingMethod| {
            pages
                .iter()
                .filter(|p| p.page.rendering_method == method)
                .count()
        };
        Self {
            pages_crawled: pages.len(),
            urls_failed: failed,
            urls_skipped: skipped,
            total_unique_links: unique_links,
            coverage_ratio: pages.len() as f64 / unique_links.max(1) as f64,
            pages_rendered: count(RenderingMethod::Dynamic),
            render_fallbacks: count(RenderingMethod::StaticFallback),
        }
    }
}
