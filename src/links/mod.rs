//! Link discovery for crawled pages
//!
//! Eleven independent strategies look for navigable URLs in a page. Each one
//! implements [`LinkExtractor`] and only produces raw candidates; the shared
//! acceptance path resolves them with [`smart_join`], canonicalizes them and
//! runs [`is_valid_url`] before anything becomes a [`LinkRecord`].

mod html;
mod metadata;
mod script;

pub use html::{AnchorExtractor, AreaExtractor, DataAttributeExtractor, FormExtractor};
pub use metadata::{
    parse_link_header, CommentExtractor, HttpHeaderExtractor, JsonLdExtractor, MetaExtractor,
    MicrodataExtractor,
};
pub use script::{is_valid_js_url, CssExtractor, JavascriptExtractor};

use crate::config::{ExtractionConfig, FilterConfig};
use crate::url::{canonicalize, is_valid_url, netloc_of, smart_join};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// The technique that produced a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Anchor,
    Area,
    Form,
    DataAttribute,
    Javascript,
    Css,
    Meta,
    JsonLd,
    Microdata,
    HttpHeader,
    Comment,
}

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Area => "area",
            Self::Form => "form",
            Self::DataAttribute => "data_attribute",
            Self::Javascript => "javascript",
            Self::Css => "css",
            Self::Meta => "meta",
            Self::JsonLd => "json_ld",
            Self::Microdata => "microdata",
            Self::HttpHeader => "http_header",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a link stays on the crawl's base domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Internal,
    External,
}

impl LinkType {
    /// Classifies a URL relative to the crawl's base domain
    pub fn classify(url: &str, base_domain: &str) -> Self {
        match netloc_of(url) {
            Some(netloc) if netloc.eq_ignore_ascii_case(base_domain) => Self::Internal,
            _ => Self::External,
        }
    }
}

/// A discovered link with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Canonical absolute URL
    pub url: String,
    pub discovery_method: DiscoveryMethod,
    pub link_type: LinkType,
}

/// Everything an extractor may look at for one page
pub struct PageContext<'a> {
    pub document: &'a Html,
    /// URL the page was served from, used to resolve relative references
    pub base_url: &'a str,
    /// Netloc of the crawl's start URL
    pub base_domain: &'a str,
    /// Response headers, keyed by lowercase name
    pub headers: &'a BTreeMap<String, String>,
    pub filters: &'a FilterConfig,
    pub normalize: bool,
}

impl<'a> PageContext<'a> {
    /// Resolves, canonicalizes and validates one candidate
    ///
    /// Malformed candidates are dropped here and never reach the frontier.
    pub fn accept(&self, candidate: &str, method: DiscoveryMethod) -> Option<LinkRecord> {
        let joined = smart_join(self.base_url, candidate)?;
        let url = canonicalize(&joined, self.normalize);
        if !is_valid_url(&url, self.base_domain, self.filters) {
            return None;
        }
        let link_type = LinkType::classify(&url, self.base_domain);
        Some(LinkRecord {
            url,
            discovery_method: method,
            link_type,
        })
    }
}

/// One link-discovery strategy
pub trait LinkExtractor: Send + Sync {
    /// The provenance tag attached to every link this extractor yields
    fn method(&self) -> DiscoveryMethod;

    /// Raw, unresolved URL candidates found in the page
    fn candidates(&self, page: &PageContext<'_>) -> Vec<String>;

    /// Candidates that survive resolution and validation
    fn extract(&self, page: &PageContext<'_>) -> Vec<LinkRecord> {
        let method = self.method();
        dedup_links(
            self.candidates(page)
                .iter()
                .filter_map(|candidate| page.accept(candidate, method)),
        )
    }
}

/// All extractors, in the order their links take precedence during dedup
static EXTRACTORS: &[&dyn LinkExtractor] = &[
    &AnchorExtractor,
    &AreaExtractor,
    &FormExtractor,
    &DataAttributeExtractor,
    &JavascriptExtractor,
    &CssExtractor,
    &MetaExtractor,
    &JsonLdExtractor,
    &MicrodataExtractor,
    &HttpHeaderExtractor,
    &CommentExtractor,
];

/// Returns every registered extractor
pub fn extractors() -> &'static [&'static dyn LinkExtractor] {
    EXTRACTORS
}

/// Runs every enabled extractor over a page and deduplicates the union
///
/// When two methods find the same normalized URL, the record from the
/// earlier extractor is kept.
pub fn extract_links(page: &PageContext<'_>, toggles: &ExtractionConfig) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for extractor in EXTRACTORS
        .iter()
        .filter(|extractor| toggles.is_enabled(extractor.method()))
    {
        let found = extractor.extract(page);
        tracing::trace!(
            "{} extractor found {} links on {}",
            extractor.method(),
            found.len(),
            page.base_url
        );
        for record in found {
            if seen.insert(canonicalize(&record.url, true)) {
                links.push(record);
            }
        }
    }

    links
}

/// Keeps the first record for each URL, preserving order
pub fn dedup_links(records: impl IntoIterator<Item = LinkRecord>) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(canonicalize(&record.url, true)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const BASE_URL: &str = "https://cafe.example/shop/";
    pub const BASE_DOMAIN: &str = "cafe.example";

    /// Runs one extractor over an HTML snippet with default filters
    pub fn run(extractor: &dyn LinkExtractor, html: &str) -> Vec<String> {
        run_with_headers(extractor, html, BTreeMap::new())
    }

    pub fn run_with_headers(
        extractor: &dyn LinkExtractor,
        html: &str,
        headers: BTreeMap<String, String>,
    ) -> Vec<String> {
        let document = Html::parse_document(html);
        let filters = FilterConfig::default();
        let page = PageContext {
            document: &document,
            base_url: BASE_URL,
            base_domain: BASE_DOMAIN,
            headers: &headers,
            filters: &filters,
            normalize: true,
        };
        extractor.extract(&page).into_iter().map(|r| r.url).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn page_links(html: &str, toggles: &ExtractionConfig) -> Vec<LinkRecord> {
        let document = Html::parse_document(html);
        let headers = BTreeMap::new();
        let filters = FilterConfig::default();
        let page = PageContext {
            document: &document,
            base_url: BASE_URL,
            base_domain: BASE_DOMAIN,
            headers: &headers,
            filters: &filters,
            normalize: true,
        };
        extract_links(&page, toggles)
    }

    #[test]
    fn test_registry_covers_every_method() {
        let methods: HashSet<_> = extractors().iter().map(|e| e.method()).collect();
        assert_eq!(methods.len(), 11);
    }

    #[test]
    fn test_dedup_keeps_first_method() {
        let html = r#"<html><body>
            <a href="/menu">Menu</a>
            <div data-href="/menu/"></div>
            <form action="/order"></form>
        </body></html>"#;
        let links = page_links(html, &ExtractionConfig::default());
        let menu: Vec<_> = links
            .iter()
            .filter(|l| l.url == "https://cafe.example/menu")
            .collect();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].discovery_method, DiscoveryMethod::Anchor);
        assert!(links.iter().any(|l| l.discovery_method == DiscoveryMethod::Form));
    }

    #[test]
    fn test_toggles_disable_methods() {
        let html = r#"<html><body><a href="/menu">Menu</a><form action="/order"></form></body></html>"#;
        let toggles = ExtractionConfig {
            anchors: false,
            ..ExtractionConfig::default()
        };
        let links = page_links(html, &toggles);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://cafe.example/order");
    }

    #[test]
    fn test_link_type_classification() {
        assert_eq!(
            LinkType::classify("https://cafe.example/menu", "cafe.example"),
            LinkType::Internal
        );
        assert_eq!(
            LinkType::classify("https://other.example/menu", "cafe.example"),
            LinkType::External
        );
    }

    #[test]
    fn test_external_links_tagged_when_followed() {
        let document = Html::parse_document(r#"<a href="https://roaster.example/beans">x</a>"#);
        let headers = BTreeMap::new();
        let filters = FilterConfig {
            follow_external_links: true,
            ..FilterConfig::default()
        };
        let page = PageContext {
            document: &document,
            base_url: BASE_URL,
            base_domain: BASE_DOMAIN,
            headers: &headers,
            filters: &filters,
            normalize: true,
        };
        let links = extract_links(&page, &ExtractionConfig::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type, LinkType::External);
    }

    #[test]
    fn test_dedup_links() {
        let record = |url: &str, method| LinkRecord {
            url: url.to_string(),
            discovery_method: method,
            link_type: LinkType::Internal,
        };
        let deduped = dedup_links(vec![
            record("https://cafe.example/a", DiscoveryMethod::Meta),
            record("https://cafe.example/a#x", DiscoveryMethod::Anchor),
            record("https://cafe.example/b", DiscoveryMethod::Anchor),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].discovery_method, DiscoveryMethod::Meta);
    }
}
