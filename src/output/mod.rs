//! Output module for persisting and summarizing crawl results
//!
//! This module provides:
//! - The link-discovery artifact and its curation statuses
//! - JSON export of full crawl results
//! - Console statistics
//! - The interface downstream entity extractors consume

mod discovery;
mod stats;
mod traits;

pub use discovery::{
    discovery_from_crawl, load_discovery, save_discovery, DiscoveredLink, DiscoveryMetadata,
    DiscoveryResult, LinkStatus,
};
pub use stats::{print_discovery_summary, print_statistics, CrawlStatistics};
pub use traits::{
    extract_all, CrawlProvenance, EntityExtractor, ExtractionInput, OutputError, OutputResult,
};

use crate::crawler::CrawlResult;
use std::fs;
use std::path::Path;

/// Writes a crawl result as pretty-printed JSON
pub fn save_crawl_result(result: &CrawlResult, path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;
    tracing::info!("Saved {} pages to {}", result.pages.len(), path.display());
    Ok(())
}

pub fn load_crawl_result(path: &Path) -> OutputResult<CrawlResult> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlStats;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_crawl_result_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.json");
        let result = CrawlResult {
            start_url: "https://cafe.example/".to_string(),
            base_domain: "cafe.example".to_string(),
            pages: Vec::new(),
            visited_urls: BTreeSet::from(["https://cafe.example/".to_string()]),
            failed_urls: BTreeSet::from(["https://cafe.example/".to_string()]),
            skipped_urls: BTreeSet::new(),
            all_discovered_links: BTreeSet::new(),
            redirect_cache: BTreeMap::new(),
            stats: CrawlStats::default(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        save_crawl_result(&result, &path).unwrap();
        let loaded = load_crawl_result(&path).unwrap();
        assert_eq!(loaded, result);
    }
}
