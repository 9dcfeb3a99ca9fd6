//! Statistics derived from a finished crawl
//!
//! This module provides functionality for summarizing a [`CrawlResult`]
//! and printing the summary to stdout.

use crate::crawler::{CrawlResult, RenderingMethod};
use crate::links::{DiscoveryMethod, LinkType};
use crate::output::DiscoveryResult;
use std::collections::{BTreeMap, HashMap};

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    pub pages_crawled: usize,
    pub urls_failed: usize,
    pub urls_skipped: usize,
    pub total_unique_links: usize,
    pub coverage_ratio: f64,

    /// Pages per rendering method
    pub pages_by_method: HashMap<RenderingMethod, usize>,

    /// Link records per discovery method, before cross-page deduplication
    pub links_by_method: BTreeMap<DiscoveryMethod, usize>,

    pub internal_links: usize,
    pub external_links: usize,

    /// Pages that yielded any structured data
    pub pages_with_structured_data: usize,
    pub products_found: usize,

    pub redirects: usize,
    pub duration_seconds: i64,
}

impl CrawlStatistics {
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut stats = Self {
            pages_crawled: result.stats.pages_crawled,
            urls_failed: result.stats.urls_failed,
            urls_skipped: result.stats.urls_skipped,
            total_unique_links: result.stats.total_unique_links,
            coverage_ratio: result.stats.coverage_ratio,
            redirects: result.redirect_cache.len(),
            duration_seconds: (result.finished_at - result.started_at).num_seconds(),
            ..Self::default()
        };

        for page in &result.pages {
            *stats
                .pages_by_method
                .entry(page.page.rendering_method)
                .or_insert(0) += 1;

            if !page.structured_data.is_empty() {
                stats.pages_with_structured_data += 1;
            }
            stats.products_found += page.structured_data.products.len();

            for link in &page.links {
                *stats.links_by_method.entry(link.discovery_method).or_insert(0) += 1;
                match link.link_type {
                    LinkType::Internal => stats.internal_links += 1,
                    LinkType::External => stats.external_links += 1,
                }
            }
        }

        stats
    }

    /// Share of dispatched URLs that produced a page, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_crawled + self.urls_failed + self.urls_skipped;
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_crawled as f64 / attempted as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.pages_crawled);
    println!("  URLs failed: {}", stats.urls_failed);
    println!("  URLs skipped (non-HTML): {}", stats.urls_skipped);
    println!("  Unique links found: {}", stats.total_unique_links);
    println!("  Coverage ratio: {:.2}", stats.coverage_ratio);
    println!("  Redirects followed: {}", stats.redirects);
    println!("  Duration: {}s", stats.duration_seconds);
    println!();

    if !stats.pages_by_method.is_empty() {
        println!("Pages by Rendering Method:");
        let mut method_counts: Vec<_> = stats.pages_by_method.iter().collect();
        method_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (method, count) in method_counts {
            let percentage = if stats.pages_crawled > 0 {
                (*count as f64 / stats.pages_crawled as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", method, count, percentage);
        }
        println!();
    }

    if !stats.links_by_method.is_empty() {
        println!(
            "Links by Discovery Method ({} internal, {} external):",
            stats.internal_links, stats.external_links
        );
        let mut link_counts: Vec<_> = stats.links_by_method.iter().collect();
        link_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (method, count) in link_counts {
            println!("  {:?}: {}", method, count);
        }
        println!();
    }

    println!("Structured Data:");
    println!(
        "  Pages with structured data: {}",
        stats.pages_with_structured_data
    );
    println!("  Products found: {}", stats.products_found);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} URLs crawled)",
        stats.success_rate(),
        stats.pages_crawled,
        stats.pages_crawled + stats.urls_failed + stats.urls_skipped
    );
}

/// Prints a short report for a discovery pass
pub fn print_discovery_summary(discovery: &DiscoveryResult) {
    let meta = &discovery.discovery_metadata;
    println!("=== Link Discovery ===\n");
    println!("  Base URL: {}", meta.base_url);
    println!("  Pages scanned: {}", meta.pages_scanned);
    println!("  Links found: {}", meta.links_found);
    if let Some(hash) = &meta.config_hash {
        println!("  Config hash: {}", hash);
    }
}
