//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding and draining the frontier in bounded batches
//! - Static fetching, JS-dependency detection and the rendering fallback
//! - Link extraction and structured-data merging on the final HTML
//! - Redirect-aware revisit suppression and inter-batch pacing
//!
//! Workers return plain values; only the coordinating task touches the
//! frontier.

use crate::config::{validate, CrawlConfig};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{clean_text, extract_title};
use crate::crawler::{
    CrawlResult, CrawlStats, CrawledPage, FetchResult, FetchedPage, RenderingMethod,
    StaticFetcher,
};
use crate::detect::JsDetector;
use crate::links::{extract_links, PageContext};
use crate::output::{discovery_from_crawl, DiscoveryResult};
use crate::render::{launch_renderer, render_dynamic, NoopRenderer, Renderer};
use crate::state::PageState;
use crate::structured::{self, StructuredDataBundle};
use crate::url::{canonicalize, netloc_of};
use crate::Result;
use chrono::Utc;
use futures::future::join_all;
use scraper::Html;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Upper bound on simultaneously open browser tabs
const MAX_RENDER_CONTEXTS: usize = 4;

/// How much work is done per fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Links, JS detection, rendering fallback, structured data and clean text
    Full,
    /// Links only
    DiscoverOnly,
}

/// Outcome of processing one dispatched URL
enum PageOutcome {
    Crawled(Box<CrawledPage>),
    Skipped,
    Failed,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<CrawlConfig>,
    fetcher: StaticFetcher,
    detector: JsDetector,
    renderer: Arc<dyn Renderer>,
    render_slots: Semaphore,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(CrawlError)` - The config is invalid or the HTTP client could
    ///   not be built
    pub fn new(config: CrawlConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        validate(&config)?;
        let fetcher = StaticFetcher::new(&config.crawler)?;
        let detector = JsDetector::new(config.js_detection.clone());
        let render_slots = Semaphore::new(config.crawler.max_workers.clamp(1, MAX_RENDER_CONTEXTS));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            detector,
            renderer,
            render_slots,
        })
    }

    /// Runs the main crawl loop from `start_url`
    ///
    /// Per-URL failures never escape: they are recorded in the result. An
    /// invalid start URL yields a result with no pages and the start URL in
    /// `failed_urls`.
    pub async fn run(&self, start_url: &str, mode: CrawlMode) -> CrawlResult {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let crawler = &self.config.crawler;

        let start = canonicalize(start_url.trim(), crawler.normalize_urls);
        let mut frontier = Frontier::new(crawler.max_pages, crawler.normalize_urls);

        let base_domain = match start_domain(&start) {
            Some(domain) => domain,
            None => {
                tracing::error!("Invalid start URL: {}", start_url);
                frontier.seed(&start);
                for url in frontier.next_batch(1) {
                    frontier.complete(&url, PageState::Failed);
                }
                return self.finish(start, String::new(), Vec::new(), frontier, started_at);
            }
        };

        tracing::info!("Starting crawl of {} (domain {})", start, base_domain);
        frontier.seed(&start);

        let mut pages: Vec<CrawledPage> = Vec::new();
        let mut batch_number = 0usize;

        loop {
            let batch = frontier.next_batch(crawler.max_workers);
            if batch.is_empty() {
                break;
            }
            batch_number += 1;
            tracing::info!(
                "Processing batch {} of {} URLs. Queue size: {}, Visited: {}",
                batch_number,
                batch.len(),
                frontier.queue_len(),
                frontier.visited().len()
            );

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|url| self.process_url(url, &base_domain, mode)),
            )
            .await;

            // The whole batch counts as visited before any redirect is compared
            for url in &batch {
                frontier.mark_visited(url);
            }

            for (url, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    PageOutcome::Crawled(page) => {
                        self.record_page(&mut frontier, &mut pages, url, *page);
                        frontier.complete(url, PageState::Extracted);
                    }
                    PageOutcome::Skipped => frontier.complete(url, PageState::Skipped),
                    PageOutcome::Failed => frontier.complete(url, PageState::Failed),
                }
            }

            if frontier.has_pending() {
                tokio::time::sleep(crawler.request_delay()).await;
            }
        }

        tracing::info!(
            "Crawl completed. Visited {} URLs, crawled {} pages ({} failed, {} skipped), found {} links and {} redirects in {:?}",
            frontier.visited().len(),
            pages.len(),
            frontier.failed().len(),
            frontier.skipped().len(),
            frontier.all_links().len(),
            self.fetcher.redirects().len(),
            start_time.elapsed()
        );

        self.finish(start, base_domain, pages, frontier, started_at)
    }

    /// Adds a finished page to the result and offers its links to the frontier
    fn record_page(
        &self,
        frontier: &mut Frontier,
        pages: &mut Vec<CrawledPage>,
        dispatched: &str,
        page: CrawledPage,
    ) {
        let final_url = canonicalize(&page.page.url, self.config.crawler.normalize_urls);
        if final_url != dispatched {
            if frontier.is_visited(&final_url) {
                tracing::debug!(
                    "{} redirected to already visited {}, not recording",
                    dispatched,
                    final_url
                );
                return;
            }
            frontier.mark_visited(&final_url);
        }

        let mut queued = 0;
        for link in &page.links {
            if frontier.offer(&link.url, self.fetcher.redirects()) {
                queued += 1;
            }
        }
        tracing::debug!(
            "Page {} contributed {} new links to queue",
            page.page.url,
            queued
        );
        pages.push(page);
    }

    /// Fetches and analyzes one URL; never touches the frontier
    async fn process_url(&self, url: &str, base_domain: &str, mode: CrawlMode) -> PageOutcome {
        tracing::debug!("Fetching: {}", url);

        let fetched = match self.fetcher.fetch(url).await {
            FetchResult::Success(page) => page,
            failure if failure.is_failure() => {
                tracing::debug!("Fetch of {} failed: {:?}", url, failure);
                return PageOutcome::Failed;
            }
            skipped => {
                tracing::debug!("Skipping {}: {:?}", url, skipped);
                return PageOutcome::Skipped;
            }
        };

        let page = match mode {
            CrawlMode::Full => self.analyze(fetched, base_domain).await,
            CrawlMode::DiscoverOnly => {
                let links = self.page_links(&fetched, base_domain);
                CrawledPage {
                    page: fetched,
                    links,
                    structured_data: StructuredDataBundle::default(),
                    clean_text: String::new(),
                }
            }
        };
        PageOutcome::Crawled(Box::new(page))
    }

    /// Full per-page work: detection, optional render, links, structured data
    async fn analyze(&self, mut page: FetchedPage, base_domain: &str) -> CrawledPage {
        let mut intercepted = Vec::new();

        if self.config.rendering.enable_dynamic_rendering {
            let verdict = self.detector.detect(&page.html_content, &page.url);
            if verdict.is_js_dependent {
                tracing::info!(
                    "{} looks JS-dependent (score {}, {:?}), rendering",
                    page.url,
                    verdict.score,
                    verdict.confidence
                );
                match self.render(&page.url).await {
                    Some(rendered) => {
                        page.html_content = rendered.html;
                        page.rendering_method = RenderingMethod::Dynamic;
                        intercepted = rendered.intercepted_json_ld;
                    }
                    None => page.rendering_method = RenderingMethod::StaticFallback,
                }
            }
        }

        let (links, structured_data, text, title) = {
            let document = Html::parse_document(&page.html_content);
            let links = self.links_in(&document, &page, base_domain);
            let structured_data = structured::merge(&document, &intercepted);
            (links, structured_data, clean_text(&document), extract_title(&document))
        };
        if title.is_some() {
            page.title = title;
        }

        CrawledPage {
            page,
            links,
            structured_data,
            clean_text: text,
        }
    }

    /// Renders in the shared browser, returning `None` on any failure
    async fn render(&self, url: &str) -> Option<crate::render::RenderedPage> {
        let _slot = match self.render_slots.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Render slot unavailable for {}: {}", url, e);
                return None;
            }
        };
        match render_dynamic(self.renderer.as_ref(), url, &self.config.rendering).await {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                tracing::warn!("Dynamic render of {} failed, keeping static HTML: {}", url, e);
                None
            }
        }
    }

    fn page_links(&self, page: &FetchedPage, base_domain: &str) -> Vec<crate::links::LinkRecord> {
        let document = Html::parse_document(&page.html_content);
        self.links_in(&document, page, base_domain)
    }

    fn links_in(
        &self,
        document: &Html,
        page: &FetchedPage,
        base_domain: &str,
    ) -> Vec<crate::links::LinkRecord> {
        let context = PageContext {
            document,
            base_url: &page.url,
            base_domain,
            headers: &page.response_headers,
            filters: &self.config.filters,
            normalize: self.config.crawler.normalize_urls,
        };
        extract_links(&context, &self.config.extraction)
    }

    fn finish(
        &self,
        start_url: String,
        base_domain: String,
        pages: Vec<CrawledPage>,
        frontier: Frontier,
        started_at: chrono::DateTime<Utc>,
    ) -> CrawlResult {
        let (visited_urls, failed_urls, skipped_urls, all_discovered_links) = frontier.into_sets();
        let stats = CrawlStats::tally(
            &pages,
            failed_urls.len(),
            skipped_urls.len(),
            all_discovered_links.len(),
        );
        tracing::info!(
            "Stats: {} pages, {} failed, {} skipped, {} unique links, coverage {:.2}",
            stats.pages_crawled,
            stats.urls_failed,
            stats.urls_skipped,
            stats.total_unique_links,
            stats.coverage_ratio
        );

        CrawlResult {
            start_url,
            base_domain,
            pages,
            visited_urls,
            failed_urls,
            skipped_urls,
            all_discovered_links,
            redirect_cache: self.fetcher.redirects().snapshot(),
            stats,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Releases the shared browser
    pub async fn shutdown(&self) {
        if let Err(e) = self.renderer.shutdown().await {
            tracing::warn!("Renderer shutdown failed: {}", e);
        }
    }
}

/// Netloc of an `http(s)` start URL
fn start_domain(start: &str) -> Option<String> {
    let parsed = url::Url::parse(start).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    netloc_of(start)
}

/// Crawls a site from `start_url`
///
/// Launches headless Chromium for the duration of the crawl when dynamic
/// rendering is enabled, and shuts it down afterwards.
///
/// # Example
///
/// ```no_run
/// use brewcrawl::{crawl, CrawlConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let result = crawl("https://cafe.example/", CrawlConfig::coffee_site(20)).await?;
/// println!("{} pages", result.stats.pages_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(start_url: &str, config: CrawlConfig) -> Result<CrawlResult> {
    validate(&config)?;
    let renderer: Arc<dyn Renderer> = Arc::from(launch_renderer(&config.rendering).await);
    crawl_with_renderer(start_url, config, renderer).await
}

/// Crawls with a caller-supplied renderer
pub async fn crawl_with_renderer(
    start_url: &str,
    config: CrawlConfig,
    renderer: Arc<dyn Renderer>,
) -> Result<CrawlResult> {
    let coordinator = Coordinator::new(config, renderer)?;
    let result = coordinator.run(start_url, CrawlMode::Full).await;
    coordinator.shutdown().await;
    Ok(result)
}

/// Link-discovery pass: same frontier, links only, no browser
pub async fn discover_links(start_url: &str, config: CrawlConfig) -> Result<DiscoveryResult> {
    let snapshot = config.clone();
    let coordinator = Coordinator::new(config, Arc::new(NoopRenderer))?;
    let result = coordinator.run(start_url, CrawlMode::DiscoverOnly).await;
    Ok(discovery_from_crawl(&result, snapshot))
}
