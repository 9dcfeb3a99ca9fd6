//! Extractors for links carried by ordinary HTML markup

use super::{DiscoveryMethod, LinkExtractor, PageContext};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));

static ARIA_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[aria-label]").expect("hardcoded selector is valid"));

static AREA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("area[href]").expect("hardcoded selector is valid"));

static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form[action]").expect("hardcoded selector is valid"));

/// Absolute URLs mentioned in accessible labels
static LABEL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^\s"'<>]+"#).expect("hardcoded regex pattern is valid")
});

/// Attributes that front-end frameworks commonly use to hold navigation targets
pub const DATA_URL_ATTRIBUTES: &[&str] = &[
    "data-href",
    "data-url",
    "data-link",
    "data-src",
    "data-target",
    "data-action",
    "data-path",
    "data-route",
    "data-endpoint",
    "data-ajax-url",
    "data-load-url",
    "data-redirect-url",
];

static DATA_ATTRIBUTE_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    DATA_URL_ATTRIBUTES
        .iter()
        .map(|attr| {
            let selector =
                Selector::parse(&format!("[{}]", attr)).expect("hardcoded selector is valid");
            (*attr, selector)
        })
        .collect()
});

/// Returns true for hrefs that never point at another page
fn is_non_navigational(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("javascript:")
        || lower.starts_with("data:")
}

/// `<a href>` plus absolute URLs written into `aria-label`
pub struct AnchorExtractor;

impl LinkExtractor for AnchorExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Anchor
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found: Vec<String> = page
            .document
            .select(&ANCHOR)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| !is_non_navigational(href))
            .map(str::to_string)
            .collect();

        for element in page.document.select(&ARIA_LABEL) {
            if let Some(label) = element.value().attr("aria-label") {
                found.extend(LABEL_URL.find_iter(label).map(|m| m.as_str().to_string()));
            }
        }

        found
    }
}

/// Image-map `<area href>`
pub struct AreaExtractor;

impl LinkExtractor for AreaExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Area
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        page.document
            .select(&AREA)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| !is_non_navigational(href))
            .map(str::to_string)
            .collect()
    }
}

/// `<form action>`
pub struct FormExtractor;

impl LinkExtractor for FormExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Form
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        page.document
            .select(&FORM)
            .filter_map(|element| element.value().attr("action"))
            .filter(|action| !is_non_navigational(action))
            .map(str::to_string)
            .collect()
    }
}

/// URL-bearing `data-*` attributes from [`DATA_URL_ATTRIBUTES`]
pub struct DataAttributeExtractor;

impl LinkExtractor for DataAttributeExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::DataAttribute
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();
        for (attr, selector) in DATA_ATTRIBUTE_SELECTORS.iter() {
            for element in page.document.select(selector) {
                if let Some(value) = element.value().attr(attr) {
                    if !is_non_navigational(value) {
                        found.push(value.to_string());
                    }
                }
            }
        }
        found
    }
}
