//! Persisted link-discovery artifact
//!
//! A discovery pass writes every link it found with a `status` field that a
//! person can edit before a later scrape pass picks up the approved ones.

use crate::config::CrawlConfig;
use crate::crawler::CrawlResult;
use crate::links::{DiscoveryMethod, LinkType};
use crate::output::traits::OutputResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Curation status of a discovered link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Scraped,
}

/// One link in the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    pub url: String,
    /// Page the link was first found on
    pub source_page: String,
    pub discovery_method: DiscoveryMethod,
    pub link_type: LinkType,
    #[serde(default)]
    pub status: LinkStatus,
}

/// Header of the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMetadata {
    pub base_url: String,
    pub domain: String,
    pub pages_scanned: usize,
    pub links_found: usize,
    pub config_snapshot: CrawlConfig,
    /// SHA-256 of the config file, when one was used
    #[serde(default)]
    pub config_hash: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

/// Result of [`crate::discover_links`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub discovery_metadata: DiscoveryMetadata,
    pub discovered_links: Vec<DiscoveredLink>,
}

impl DiscoveryResult {
    /// URLs a curator marked as approved, in artifact order
    pub fn approved_urls(&self) -> Vec<&str> {
        self.urls_with_status(LinkStatus::Approved)
    }

    pub fn urls_with_status(&self, status: LinkStatus) -> Vec<&str> {
        self.discovered_links
            .iter()
            .filter(|link| link.status == status)
            .map(|link| link.url.as_str())
            .collect()
    }

    /// Sets the status of `url`; returns false if the URL is not listed
    pub fn set_status(&mut self, url: &str, status: LinkStatus) -> bool {
        match self.discovered_links.iter_mut().find(|link| link.url == url) {
            Some(link) => {
                link.status = status;
                true
            }
            None => false,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.discovery_metadata.config_hash = Some(hash.into());
        self
    }
}

/// Builds the artifact from a links-only crawl
///
/// Each URL appears once, attributed to the first page and method that
/// produced it.
pub fn discovery_from_crawl(result: &CrawlResult, config: CrawlConfig) -> DiscoveryResult {
    let mut seen = HashSet::new();
    let discovered_links: Vec<DiscoveredLink> = result
        .pages
        .iter()
        .flat_map(|page| {
            page.links.iter().map(move |link| DiscoveredLink {
                url: link.url.clone(),
                source_page: page.page.url.clone(),
                discovery_method: link.discovery_method,
                link_type: link.link_type,
                status: LinkStatus::Pending,
            })
        })
        .filter(|link| seen.insert(link.url.clone()))
        .collect();

    DiscoveryResult {
        discovery_metadata: DiscoveryMetadata {
            base_url: result.start_url.clone(),
            domain: result.base_domain.clone(),
            pages_scanned: result.pages.len(),
            links_found: discovered_links.len(),
            config_snapshot: config,
            config_hash: None,
            discovered_at: result.finished_at,
        },
        discovered_links,
    }
}

/// Writes the artifact as pretty-printed JSON
pub fn save_discovery(discovery: &DiscoveryResult, path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(discovery)?;
    fs::write(path, json)?;
    tracing::info!(
        "Saved {} discovered links to {}",
        discovery.discovered_links.len(),
        path.display()
    );
    Ok(())
}

/// Reads an artifact, including any statuses edited since it was saved
pub fn load_discovery(path: &Path) -> OutputResult<DiscoveryResult> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlStats, CrawledPage, FetchedPage, RenderingMethod};
    use crate::links::LinkRecord;
    use crate::structured::StructuredDataBundle;
    use std::collections::{BTreeMap, BTreeSet};

    fn link(url: &str, method: DiscoveryMethod) -> LinkRecord {
        LinkRecord {
            url: url.to_string(),
            discovery_method: method,
            link_type: LinkType::Internal,
        }
    }

    fn page(url: &str, links: Vec<LinkRecord>) -> CrawledPage {
        CrawledPage {
            page: FetchedPage {
                url: url.to_string(),
                original_url: None,
                title: None,
                html_content: String::new(),
                status_code: 200,
                content_type: "text/html".to_string(),
                response_headers: BTreeMap::new(),
                rendering_method: RenderingMethod::Static,
            },
            links,
            structured_data: StructuredDataBundle::default(),
            clean_text: String::new(),
        }
    }

    fn sample() -> DiscoveryResult {
        let pages = vec![
            page(
                "https://cafe.example/",
                vec![
                    link("https://cafe.example/menu", DiscoveryMethod::Anchor),
                    link("https://cafe.example/beans", DiscoveryMethod::JsonLd),
                ],
            ),
            page(
                "https://cafe.example/menu",
                vec![link("https://cafe.example/beans", DiscoveryMethod::Anchor)],
            ),
        ];
        let result = CrawlResult {
            start_url: "https://cafe.example/".to_string(),
            base_domain: "cafe.example".to_string(),
            stats: CrawlStats::default(),
            pages,
            visited_urls: BTreeSet::new(),
            failed_urls: BTreeSet::new(),
            skipped_urls: BTreeSet::new(),
            all_discovered_links: BTreeSet::new(),
            redirect_cache: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        discovery_from_crawl(&result, CrawlConfig::default())
    }

    #[test]
    fn test_first_source_wins() {
        let discovery = sample();
        assert_eq!(discovery.discovered_links.len(), 2);
        assert_eq!(discovery.discovery_metadata.links_found, 2);
        assert_eq!(discovery.discovery_metadata.pages_scanned, 2);
        let beans = &discovery.discovered_links[1];
        assert_eq!(beans.source_page, "https://cafe.example/");
        assert_eq!(beans.discovery_method, DiscoveryMethod::JsonLd);
        assert_eq!(beans.status, LinkStatus::Pending);
    }

    #[test]
    fn test_save_edit_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.json");
        save_discovery(&sample().with_config_hash("abc123"), &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"discovery_metadata\""));
        assert!(raw.contains("\"status\": \"pending\""));

        // a curator approves one link by editing the file
        let edited = raw.replacen("\"status\": \"pending\"", "\"status\": \"approved\"", 1);
        fs::write(&path, edited).unwrap();

        let loaded = load_discovery(&path).unwrap();
        assert_eq!(loaded.approved_urls(), vec!["https://cafe.example/menu"]);
        assert_eq!(loaded.discovery_metadata.config_hash.as_deref(), Some("abc123"));
        assert_eq!(loaded.discovery_metadata.config_snapshot, CrawlConfig::default());
    }

    #[test]
    fn test_set_status() {
        let mut discovery = sample();
        assert!(discovery.set_status("https://cafe.example/beans", LinkStatus::Rejected));
        assert!(!discovery.set_status("https://cafe.example/nope", LinkStatus::Approved));
        assert_eq!(
            discovery.urls_with_status(LinkStatus::Rejected),
            vec!["https://cafe.example/beans"]
        );
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(load_discovery(Path::new("/nonexistent/discovery.json")).is_err());
    }
}
