//! Output error types and the downstream extraction interface
//!
//! This module defines what a crawl hands to entity extractors: one
//! [`ExtractionInput`] per page plus the [`CrawlProvenance`] of the run.

use crate::crawler::CrawlResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One page as seen by an entity extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionInput {
    pub html_content: String,
    pub source_url: String,
}

/// Where and when a batch of extraction inputs came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlProvenance {
    pub base_url: String,
    pub visited_urls: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Turns crawled pages into domain entities
///
/// Implementations live outside this crate; the crawler only promises the
/// shape of the input.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    type Entity: Send;

    /// Extracts entities from one page
    async fn extract(&self, input: &ExtractionInput) -> OutputResult<Vec<Self::Entity>>;
}

impl CrawlResult {
    /// One input per crawled page, in crawl order
    pub fn extraction_inputs(&self) -> Vec<ExtractionInput> {
        self.pages
            .iter()
            .map(|page| ExtractionInput {
                html_content: page.page.html_content.clone(),
                source_url: page.page.url.clone(),
            })
            .collect()
    }

    pub fn provenance(&self) -> CrawlProvenance {
        CrawlProvenance {
            base_url: self.start_url.clone(),
            visited_urls: self.visited_urls.iter().cloned().collect(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Runs `extractor` over every crawled page
///
/// A page whose extraction fails is logged and contributes nothing.
pub async fn extract_all<E: EntityExtractor>(
    extractor: &E,
    result: &CrawlResult,
) -> Vec<E::Entity> {
    let mut entities = Vec::new();
    for input in result.extraction_inputs() {
        match extractor.extract(&input).await {
            Ok(found) => entities.extend(found),
            Err(e) => tracing::warn!("{}", e),
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlStats, CrawledPage, FetchedPage, RenderingMethod};
    use crate::structured::StructuredDataBundle;
    use std::collections::{BTreeMap, BTreeSet};

    /// Counts `<h2>` headings and fails on pages without any
    struct HeadingCounter;

    #[async_trait]
    impl EntityExtractor for HeadingCounter {
        type Entity = (String, usize);

        async fn extract(&self, input: &ExtractionInput) -> OutputResult<Vec<Self::Entity>> {
            let count = input.html_content.matches("<h2>").count();
            if count == 0 {
                return Err(OutputError::Extraction {
                    url: input.source_url.clone(),
                    message: "no headings".to_string(),
                });
            }
            Ok(vec![(input.source_url.clone(), count)])
        }
    }

    fn page(url: &str, html: &str) -> CrawledPage {
        CrawledPage {
            page: FetchedPage {
                url: url.to_string(),
                original_url: None,
                title: None,
                html_content: html.to_string(),
                status_code: 200,
                content_type: "text/html".to_string(),
                response_headers: BTreeMap::new(),
                rendering_method: RenderingMethod::Static,
            },
            links: Vec::new(),
            structured_data: StructuredDataBundle::default(),
            clean_text: String::new(),
        }
    }

    fn result() -> CrawlResult {
        let started_at = Utc::now();
        CrawlResult {
            start_url: "https://cafe.example/".to_string(),
            base_domain: "cafe.example".to_string(),
            pages: vec![
                page("https://cafe.example/", "<h2>Espresso</h2><h2>Filter</h2>"),
                page("https://cafe.example/about", "<p>About us</p>"),
            ],
            visited_urls: BTreeSet::from([
                "https://cafe.example/".to_string(),
                "https://cafe.example/about".to_string(),
            ]),
            failed_urls: BTreeSet::new(),
            skipped_urls: BTreeSet::new(),
            all_discovered_links: BTreeSet::new(),
            redirect_cache: BTreeMap::new(),
            stats: CrawlStats::default(),
            started_at,
            finished_at: started_at,
        }
    }

    #[test]
    fn test_extraction_inputs_follow_crawl_order() {
        let inputs = result().extraction_inputs();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].source_url, "https://cafe.example/");
        assert!(inputs[1].html_content.contains("About us"));
    }

    #[test]
    fn test_provenance() {
        let result = result();
        let provenance = result.provenance();
        assert_eq!(provenance.base_url, "https://cafe.example/");
        assert_eq!(provenance.visited_urls.len(), 2);
        assert!(provenance.started_at <= provenance.finished_at);
    }

    #[tokio::test]
    async fn test_extract_all_skips_failed_pages() {
        let entities = extract_all(&HeadingCounter, &result()).await;
        assert_eq!(entities, vec![("https://cafe.example/".to_string(), 2)]);
    }
}
