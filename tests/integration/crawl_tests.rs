//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end. Dynamic rendering is switched off so no browser
//! is needed.

use brewcrawl::output::{load_discovery, save_discovery};
use brewcrawl::structured::ExtractionMethod;
use brewcrawl::{crawl, discover_links, CrawlConfig, DiscoveryMethod, LinkStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Static-only configuration with no pacing between batches
fn test_config(max_pages: usize, max_workers: usize) -> CrawlConfig {
    let mut config = CrawlConfig::default();
    config.crawler.max_pages = max_pages;
    config.crawler.max_workers = max_workers;
    config.crawler.request_delay_ms = 0;
    config.crawler.timeout_secs = 5;
    config.rendering.enable_dynamic_rendering = false;
    config
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Home page linking to `/p0` .. `/p{count-1}`, each an empty leaf page
async fn mount_link_farm(server: &MockServer, count: usize) {
    let anchors: String = (0..count)
        .map(|n| format!(r#"<a href="/p{}">Page {}</a>"#, n, n))
        .collect();
    mount_page(
        server,
        "/",
        format!("<html><head><title>Home</title></head><body>{}</body></html>", anchors),
    )
    .await;
    for n in 0..count {
        mount_page(
            server,
            &format!("/p{}", n),
            format!("<html><head><title>Page {}</title></head><body>Leaf</body></html>", n),
        )
        .await;
    }
}

#[tokio::test]
async fn test_page_cap_and_coverage_ratio() {
    let server = MockServer::start().await;
    mount_link_farm(&server, 20).await;

    let result = crawl(&format!("{}/", server.uri()), test_config(5, 2))
        .await
        .expect("crawl failed");

    assert_eq!(result.visited_urls.len(), 5);
    assert_eq!(result.pages.len(), 5);
    assert_eq!(result.stats.total_unique_links, 20);
    assert!((result.stats.coverage_ratio - 0.25).abs() < 1e-9);
    assert_eq!(result.pages[0].page.title.as_deref(), Some("Home"));
    assert!(result
        .pages
        .iter()
        .all(|p| p.page.rendering_method == brewcrawl::RenderingMethod::Static));
}

#[tokio::test]
async fn test_breadth_first_order() {
    let server = MockServer::start().await;
    mount_link_farm(&server, 3).await;

    let result = crawl(&format!("{}/", server.uri()), test_config(10, 1))
        .await
        .expect("crawl failed");

    let order: Vec<String> = result.pages.iter().map(|p| p.page.url.clone()).collect();
    let base = server.uri();
    assert_eq!(
        order,
        vec![
            format!("{}/", base),
            format!("{}/p0", base),
            format!("{}/p1", base),
            format!("{}/p2", base),
        ]
    );
}

#[tokio::test]
async fn test_redirect_to_visited_page_is_not_recorded_twice() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/menu">Menu</a><a href="/old-menu">Old menu</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/menu", "<html><head><title>Menu</title></head><body>Espresso</body></html>").await;
    Mock::given(method("GET"))
        .and(path("/old-menu"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/menu"))
        .mount(&server)
        .await;

    let result = crawl(&format!("{}/", base), test_config(10, 5))
        .await
        .expect("crawl failed");

    let menu_pages = result
        .pages
        .iter()
        .filter(|p| p.page.url == format!("{}/menu", base))
        .count();
    assert_eq!(menu_pages, 1);
    assert_eq!(result.pages.len(), 2);
    assert_eq!(
        result.redirect_cache.get(&format!("{}/old-menu", base)),
        Some(&format!("{}/menu", base))
    );
    assert!(result.failed_urls.is_empty());
}

#[tokio::test]
async fn test_cached_redirect_is_not_fetched_again() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<html><body><a href="/old-menu">Menu</a></body></html>"#).await;
    Mock::given(method("GET"))
        .and(path("/old-menu"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/menu/"))
        .expect(1)
        .mount(&server)
        .await;
    let menu = r#"<html><head><title>Menu</title></head><body><a href="/about">About</a></body></html>"#;
    mount_page(&server, "/menu/", menu).await;
    mount_page(&server, "/menu", menu).await;
    mount_page(
        &server,
        "/about",
        r#"<html><body><a href="/old-menu">Back to the menu</a></body></html>"#,
    )
    .await;

    let result = crawl(&format!("{}/", base), test_config(10, 1))
        .await
        .expect("crawl failed");

    let old_menu_hits = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == "/old-menu")
        .count();
    assert_eq!(old_menu_hits, 1);
    let menu_pages = result
        .pages
        .iter()
        .filter(|p| p.page.title.as_deref() == Some("Menu"))
        .count();
    assert_eq!(menu_pages, 1);
    assert!(result
        .redirect_cache
        .contains_key(&format!("{}/old-menu", base)));
    assert!(result.visited_urls.contains(&format!("{}/about", base)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_crawling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let result = crawl(&format!("{}/", server.uri()), test_config(10, 0)).await;

    assert!(matches!(
        result,
        Err(brewcrawl::CrawlError::Config(brewcrawl::ConfigError::Validation(_)))
    ));
}

#[tokio::test]
async fn test_failed_urls_are_accounted() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/missing">Gone</a><a href="/broken">Broken</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = crawl(&format!("{}/", base), test_config(10, 5))
        .await
        .expect("crawl failed");

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.stats.urls_failed, 2);
    assert!(result.failed_urls.contains(&format!("{}/missing", base)));
    assert!(result.failed_urls.contains(&format!("{}/broken", base)));
    assert!(result.visited_urls.contains(&format!("{}/broken", base)));
}

#[tokio::test]
async fn test_non_html_response_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<html><body><a href="/api/beans">Beans</a></body></html>"#).await;
    Mock::given(method("GET"))
        .and(path("/api/beans"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"beans":[]}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let result = crawl(&format!("{}/", base), test_config(10, 5))
        .await
        .expect("crawl failed");

    let beans = format!("{}/api/beans", base);
    assert!(result.skipped_urls.contains(&beans));
    assert!(!result.failed_urls.contains(&beans));
    assert!(result.pages.iter().all(|p| p.page.url != beans));
    assert_eq!(result.stats.urls_skipped, 1);
}

#[tokio::test]
async fn test_external_links_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body>
        <a href="/about">About</a>
        <a href="https://social.example/our-cafe">Follow us</a>
        </body></html>"#,
    )
    .await;
    mount_page(&server, "/about", "<html><body>About</body></html>").await;

    let result = crawl(&format!("{}/", base), test_config(10, 5))
        .await
        .expect("crawl failed");

    assert_eq!(result.pages.len(), 2);
    assert!(!result
        .all_discovered_links
        .iter()
        .any(|url| url.contains("social.example")));
}

#[tokio::test]
async fn test_link_sets_are_deterministic() {
    let server = MockServer::start().await;
    mount_link_farm(&server, 8).await;
    let start = format!("{}/", server.uri());

    let first = crawl(&start, test_config(6, 3)).await.expect("crawl failed");
    let second = crawl(&start, test_config(6, 3)).await.expect("crawl failed");

    assert_eq!(first.visited_urls, second.visited_urls);
    assert_eq!(first.all_discovered_links, second.all_discovered_links);
}

#[tokio::test]
async fn test_structured_data_and_clean_text() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Roastery</title>
        <meta name="description" content="Small batch roasters">
        <script type="application/ld+json">
        {"@context": "https://schema.org", "@type": "Product", "name": "House Blend",
         "offers": {"@type": "Offer", "price": "14.00", "priceCurrency": "USD"}}
        </script></head>
        <body><nav>Home | Shop</nav><main><h1>House Blend</h1><p>Chocolate and cherry.</p></main></body></html>"#,
    )
    .await;

    let result = crawl(&format!("{}/", server.uri()), test_config(1, 1))
        .await
        .expect("crawl failed");

    let page = &result.pages[0];
    let data = &page.structured_data;
    assert_eq!(data.json_ld.len(), 1);
    assert!(data.has_method(ExtractionMethod::JsonLd));
    assert!(data.has_method(ExtractionMethod::MetaTags));
    assert_eq!(data.products.len(), 1);
    assert_eq!(data.products[0].name, "House Blend");
    assert!(page.clean_text.contains("Chocolate and cherry."));
    assert!(!page.clean_text.contains("Home | Shop"));
}

#[tokio::test]
async fn test_discovery_pass_writes_curatable_artifact() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_link_farm(&server, 3).await;

    let discovery = discover_links(&format!("{}/", base), test_config(10, 5))
        .await
        .expect("discovery failed");

    assert_eq!(discovery.discovery_metadata.pages_scanned, 4);
    assert_eq!(discovery.discovery_metadata.links_found, 3);
    assert!(discovery
        .discovered_links
        .iter()
        .all(|l| l.status == LinkStatus::Pending
            && l.discovery_method == DiscoveryMethod::Anchor
            && l.source_page == format!("{}/", base)));

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("links.json");
    let mut edited = discovery.clone();
    assert!(edited.set_status(&format!("{}/p1", base), LinkStatus::Approved));
    save_discovery(&edited, &file).unwrap();

    let loaded = load_discovery(&file).unwrap();
    assert_eq!(loaded.approved_urls(), vec![format!("{}/p1", base).as_str()]);
}

#[tokio::test]
async fn test_unreachable_start_url_yields_empty_result() {
    // Port 9 (discard) is not served by anything in the test environment
    let result = crawl("http://127.0.0.1:9/", test_config(5, 1))
        .await
        .expect("crawl failed");

    assert!(result.is_empty());
    assert_eq!(result.failed_urls.len(), 1);
}
