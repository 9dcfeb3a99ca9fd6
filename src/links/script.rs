//! Extractors for URLs hidden in inline JavaScript and CSS

use super::{DiscoveryMethod, LinkExtractor, PageContext};
use crate::url::count_occurrences;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;

static INLINE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").expect("hardcoded selector is valid"));

static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("hardcoded selector is valid"));

static STYLE_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("hardcoded selector is valid"));

static STYLE_ATTR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[style]").expect("hardcoded selector is valid"));

/// Patterns whose first capture group is a URL candidate
static JS_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // location.href = "/x", window.location = "/x"
        r#"location(?:\.href)?\s*=\s*["'`]([^"'`]+)["'`]"#,
        r#"location\.(?:assign|replace)\(\s*["'`]([^"'`]+)["'`]"#,
        r#"\.ajax\(\s*["'`]([^"'`]+)["'`]"#,
        r#"\bfetch\(\s*["'`]([^"'`]+)["'`]"#,
        // { url: "/x" }
        r#"\b(?:url|endpoint|action|path|route)["']?\s*:\s*["'`]([^"'`]+)["'`]"#,
        // quoted root-relative paths and page-like file names
        r#"["'`](/[A-Za-z0-9_\-./]*[A-Za-z0-9_\-/])["'`]"#,
        r#"["'`]([A-Za-z0-9_\-./]+\.(?:html?|php|aspx?|jsp))["'`]"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hardcoded regex pattern is valid"))
    .collect()
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("hardcoded regex pattern is valid")
});

/// Prefixes that mark a captured string as code rather than a URL
const CODE_TOKEN_PREFIXES: &[&str] = &[
    "javascript:",
    "mailto:",
    "tel:",
    "data:",
    "var ",
    "let ",
    "const ",
    "function",
    "return",
    "this.",
    "new ",
    "#",
    "{",
    "}",
    "(",
    ")",
    "[",
    "]",
    "$",
    "+",
    "=",
    ";",
];

/// Extensions that identify static assets rather than pages
const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".bmp", ".avif", ".woff", ".woff2",
    ".ttf", ".otf", ".eot", ".css", ".js", ".json", ".xml",
];

/// Decides whether a string captured from script text is plausibly a URL
///
/// Absolute `http(s)` candidates are checked on their path only, so a host
/// with a port still passes the character-class test. Query strings may
/// additionally carry `=`, `&` and `%`.
pub fn is_valid_js_url(candidate: &str, base_domain: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }

    let lower = candidate.to_ascii_lowercase();
    if CODE_TOKEN_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return false;
    }

    if candidate.contains(['<', '>']) {
        return false;
    }

    if !base_domain.is_empty() && count_occurrences(candidate, base_domain) > 1 {
        return false;
    }

    let (absolute, remainder) = match lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    {
        Some(rest) => (true, rest.find('/').map(|idx| &rest[idx..]).unwrap_or("")),
        None => (false, lower.as_str()),
    };
    let (path, suffix) = match remainder.find(['?', '#']) {
        Some(idx) => remainder.split_at(idx),
        None => (remainder, ""),
    };

    if !suffix.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '?' | '#' | '=' | '&' | '%' | '_' | '.' | '-' | '/')
    }) {
        return false;
    }

    let mut segments = HashSet::new();
    if !path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .all(|segment| segments.insert(segment))
    {
        return false;
    }

    if !path
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '_' | '.' | '-'))
    {
        return false;
    }

    if !absolute && !path.contains('/') && !path.contains('.') {
        return false;
    }

    true
}

/// Navigation targets in inline scripts and `on*` handlers
pub struct JavascriptExtractor;

impl JavascriptExtractor {
    fn scan(text: &str, base_domain: &str, found: &mut Vec<String>) {
        for pattern in JS_URL_PATTERNS.iter() {
            for captures in pattern.captures_iter(text) {
                if let Some(candidate) = captures.get(1) {
                    let candidate = candidate.as_str();
                    if is_valid_js_url(candidate, base_domain) {
                        found.push(candidate.to_string());
                    }
                }
            }
        }
    }
}

impl LinkExtractor for JavascriptExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Javascript
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();

        for script in page.document.select(&INLINE_SCRIPT) {
            let is_json = script
                .value()
                .attr("type")
                .is_some_and(|t| t.to_ascii_lowercase().contains("json"));
            if is_json {
                continue;
            }
            let body: String = script.text().collect();
            Self::scan(&body, page.base_domain, &mut found);
        }

        for element in page.document.select(&ANY_ELEMENT) {
            for (name, value) in element.value().attrs() {
                if name.starts_with("on") {
                    Self::scan(value, page.base_domain, &mut found);
                }
            }
        }

        found
    }
}

/// `url(...)` references in `<style>` blocks and `style` attributes
pub struct CssExtractor;

impl CssExtractor {
    fn is_page_reference(reference: &str) -> bool {
        let lower = reference.to_ascii_lowercase();
        if ["data:", "#", "javascript:", "mailto:", "tel:"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            return false;
        }
        let path = lower.split(['?', '#']).next().unwrap_or(lower.as_str());
        !ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    fn scan(css: &str, found: &mut Vec<String>) {
        for captures in CSS_URL.captures_iter(css) {
            if let Some(reference) = captures.get(1) {
                if Self::is_page_reference(reference.as_str()) {
                    found.push(reference.as_str().to_string());
                }
            }
        }
    }
}

impl LinkExtractor for CssExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Css
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();
        for block in page.document.select(&STYLE_BLOCK) {
            let css: String = block.text().collect();
            Self::scan(&css, &mut found);
        }
        for element in page.document.select(&STYLE_ATTR) {
            if let Some(style) = element.value().attr("style") {
                Self::scan(style, &mut found);
            }
        }
        found
    }
}
