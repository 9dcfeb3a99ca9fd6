//! HTML helpers for page metadata and text
//!
//! This module extracts from a parsed document:
//! - The page title
//! - Visible text with non-content elements removed
//!
//! Link discovery lives in [`crate::links`].

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("hardcoded selector is valid"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("hardcoded selector is valid"));

/// Elements whose text is never part of a page's readable content
pub const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "footer", "header",
];

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Readable body text, whitespace collapsed
    pub clean_text: String,
}

/// Parses HTML content and extracts title and readable text
///
/// # Example
///
/// ```
/// use brewcrawl::crawler::parse_page;
///
/// let html = r#"<html><head><title>Test</title></head><body><nav>Menu</nav><p>Fresh  beans</p></body></html>"#;
/// let parsed = parse_page(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.clean_text, "Fresh beans");
/// ```
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    ParsedPage {
        title: extract_title(&document),
        clean_text: clean_text(&document),
    }
}

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Body text with scripts, styles, navigation, headers and footers removed
pub fn clean_text(document: &Html) -> String {
    document
        .select(&BODY)
        .next()
        .map(|body| visible_text(body, BOILERPLATE_TAGS))
        .unwrap_or_default()
}

/// Text under `root`, skipping any text node nested in one of `excluded`
///
/// Text nodes are joined with spaces and whitespace runs collapsed.
pub fn visible_text(root: ElementRef<'_>, excluded: &[&str]) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| excluded.contains(&element.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
