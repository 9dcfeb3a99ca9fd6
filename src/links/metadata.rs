//! Extractors for links declared as page metadata rather than visible markup

use super::{DiscoveryMethod, LinkExtractor, PageContext};
use crate::structured::embedded_json_ld;
use regex::Regex;
use scraper::Selector;
use serde_json::Value;
use std::sync::LazyLock;

static META_REFRESH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[http-equiv][content]").expect("hardcoded selector is valid"));

static LINK_REL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href]").expect("hardcoded selector is valid"));

static ITEM_ID_OR_TYPE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[itemid], [itemtype]").expect("hardcoded selector is valid")
});

static ITEMPROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemprop]").expect("hardcoded selector is valid"));

static REFRESH_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\s*=\s*['"]?([^'";\s]+)"#).expect("hardcoded regex pattern is valid")
});

static COMMENT_ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>()]+"#).expect("hardcoded regex pattern is valid")
});

static COMMENT_ROOT_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s"'=(])(/[A-Za-z0-9_\-.]+(?:/[A-Za-z0-9_\-.]+)*/?)"#)
        .expect("hardcoded regex pattern is valid")
});

/// `<link rel>` values that point at related pages
const PAGE_RELATIONS: &[&str] = &[
    "canonical",
    "next",
    "prev",
    "alternate",
    "related",
    "author",
    "help",
];

/// `Link` header relations worth crawling
const HEADER_RELATIONS: &[&str] = &["next", "prev", "canonical", "alternate", "related"];

/// Structured-data keys whose values are URLs
const URL_KEYS: &[&str] = &["url", "sameAs", "mainEntityOfPage", "image", "logo"];

/// `<meta http-equiv="refresh">` targets and `<link rel>` relations
pub struct MetaExtractor;

impl LinkExtractor for MetaExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Meta
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();

        for meta in page.document.select(&META_REFRESH) {
            let element = meta.value();
            let is_refresh = element
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"));
            if !is_refresh {
                continue;
            }
            if let Some(target) = element
                .attr("content")
                .and_then(|content| REFRESH_TARGET.captures(content))
                .and_then(|captures| captures.get(1))
            {
                found.push(target.as_str().to_string());
            }
        }

        for link in page.document.select(&LINK_REL) {
            let element = link.value();
            let (Some(rel), Some(href)) = (element.attr("rel"), element.attr("href")) else {
                continue;
            };
            let wanted = rel
                .split_ascii_whitespace()
                .any(|token| PAGE_RELATIONS.iter().any(|r| token.eq_ignore_ascii_case(r)));
            if wanted {
                found.push(href.to_string());
            }
        }

        found
    }
}

/// String values under URL-typed keys of embedded JSON-LD
pub struct JsonLdExtractor;

fn collect_json_ld_urls(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if URL_KEYS.contains(&key.as_str()) {
                    match child {
                        Value::String(s) => found.push(s.clone()),
                        Value::Array(items) => found.extend(
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string),
                        ),
                        _ => {}
                    }
                }
                collect_json_ld_urls(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_json_ld_urls(item, found);
            }
        }
        _ => {}
    }
}

impl LinkExtractor for JsonLdExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::JsonLd
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();
        for payload in embedded_json_ld(page.document) {
            collect_json_ld_urls(&payload, &mut found);
        }
        found
    }
}

/// `itemid`/`itemtype` values and URL-typed `itemprop` elements
pub struct MicrodataExtractor;

impl LinkExtractor for MicrodataExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Microdata
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();

        for element in page.document.select(&ITEM_ID_OR_TYPE) {
            let element = element.value();
            if let Some(id) = element.attr("itemid") {
                found.push(id.to_string());
            }
            if let Some(types) = element.attr("itemtype") {
                found.extend(types.split_ascii_whitespace().map(str::to_string));
            }
        }

        for element in page.document.select(&ITEMPROP) {
            let element = element.value();
            let is_url_prop = element.attr("itemprop").is_some_and(|props| {
                props
                    .split_ascii_whitespace()
                    .any(|prop| URL_KEYS.contains(&prop))
            });
            if !is_url_prop {
                continue;
            }
            if let Some(value) = ["href", "src", "content"]
                .iter()
                .find_map(|attr| element.attr(attr))
            {
                found.push(value.to_string());
            }
        }

        found
    }
}

/// Parses an RFC 5988 `Link` header into `(target, relations)` pairs
///
/// Commas inside `<...>` do not split entries. Relations are lowercased.
///
/// # Examples
///
/// ```
/// use brewcrawl::links::parse_link_header;
///
/// let parsed = parse_link_header(r#"</menu?page=2>; rel="next", </>; rel="canonical home""#);
/// assert_eq!(parsed[0].0, "/menu?page=2");
/// assert_eq!(parsed[1].1, vec!["canonical", "home"]);
/// ```
pub fn parse_link_header(header: &str) -> Vec<(String, Vec<String>)> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in header.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    entries.push(&header[start..]);

    entries
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            let open = entry.find('<')?;
            let close = open + entry[open..].find('>')?;
            let target = entry[open + 1..close].trim().to_string();
            let relations = entry[close + 1..]
                .split(';')
                .filter_map(|param| {
                    let (name, value) = param.split_once('=')?;
                    name.trim()
                        .eq_ignore_ascii_case("rel")
                        .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
                })
                .flat_map(|value| {
                    value
                        .split_ascii_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect();
            Some((target, relations))
        })
        .collect()
}

/// `Link` response headers with crawlable relations
pub struct HttpHeaderExtractor;

impl LinkExtractor for HttpHeaderExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::HttpHeader
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let Some(header) = page.headers.get("link") else {
            return Vec::new();
        };
        parse_link_header(header)
            .into_iter()
            .filter(|(_, relations)| {
                relations
                    .iter()
                    .any(|rel| HEADER_RELATIONS.contains(&rel.as_str()))
            })
            .map(|(target, _)| target)
            .collect()
    }
}

/// URL-shaped text inside HTML comments
pub struct CommentExtractor;

impl LinkExtractor for CommentExtractor {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Comment
    }

    fn candidates(&self, page: &PageContext<'_>) -> Vec<String> {
        let mut found = Vec::new();
        for node in page.document.tree.root().descendants() {
            let Some(comment) = node.value().as_comment() else {
                continue;
            };
            let text: &str = comment;
            found.extend(
                COMMENT_ABSOLUTE
                    .find_iter(text)
                    .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string()),
            );
            found.extend(
                COMMENT_ROOT_RELATIVE
                    .captures_iter(text)
                    .filter_map(|captures| captures.get(1))
                    .map(|m| m.as_str().to_string()),
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, run_with_headers};
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_meta_refresh_and_relations() {
        let html = r#"<html><head>
            <meta http-equiv="Refresh" content="5; URL='/new-menu'">
            <link rel="canonical" href="https://cafe.example/shop">
            <link rel="next" href="/shop?page=2">
            <link rel="stylesheet" href="/theme">
            <link rel="author" href="/team">
        </head></html>"#;
        let links = run(&MetaExtractor, html);
        assert_eq!(
            links,
            vec![
                "https://cafe.example/new-menu",
                "https://cafe.example/shop",
                "https://cafe.example/shop?page=2",
                "https://cafe.example/team",
            ]
        );
    }

    #[test]
    fn test_json_ld_nested_urls() {
        let html = r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "CafeOrCoffeeShop",
             "url": "https://cafe.example/",
             "sameAs": ["https://cafe.example/about", "https://social.example/cafe"],
             "hasMenu": {"@type": "Menu", "url": "/menu"},
             "name": "Corner Cafe"}
        </script>
        <script type="application/ld+json">[{"@type": "WebPage", "mainEntityOfPage": "/story"}]</script>
        <script type="application/ld+json">{ not json</script>"#;
        let links = run(&JsonLdExtractor, html);
        assert!(links.contains(&"https://cafe.example/".to_string()));
        assert!(links.contains(&"https://cafe.example/about".to_string()));
        assert!(links.contains(&"https://cafe.example/menu".to_string()));
        assert!(links.contains(&"https://cafe.example/story".to_string()));
        assert!(!links.iter().any(|l| l.contains("social.example")));
    }

    #[test]
    fn test_microdata_urls() {
        let html = r#"<div itemscope itemtype="https://schema.org/Product" itemid="/products/house-blend">
            <a itemprop="url" href="/products/house-blend/details">Details</a>
            <meta itemprop="mainEntityOfPage" content="/products">
            <span itemprop="name">House Blend</span>
        </div>"#;
        let links = run(&MicrodataExtractor, html);
        assert!(links.contains(&"https://cafe.example/products/house-blend".to_string()));
        assert!(links.contains(&"https://cafe.example/products/house-blend/details".to_string()));
        assert!(links.contains(&"https://cafe.example/products".to_string()));
        assert!(!links.iter().any(|l| l.contains("schema.org")));
    }

    #[test]
    fn test_parse_link_header() {
        let parsed = parse_link_header(
            r#"<https://cafe.example/menu?a=1,2>; rel="next", </style.css>; rel=preload; as=style"#,
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "https://cafe.example/menu?a=1,2");
        assert_eq!(parsed[0].1, vec!["next"]);
        assert_eq!(parsed[1].1, vec!["preload"]);
    }

    #[test]
    fn test_http_header_relations() {
        let mut headers = BTreeMap::new();
        headers.insert(
            "link".to_string(),
            r#"</menu?page=2>; rel="next", </wp-json/>; rel="https://api.w.org/", </about>; rel="alternate""#
                .to_string(),
        );
        let links = run_with_headers(&HttpHeaderExtractor, "<html></html>", headers);
        assert_eq!(
            links,
            vec![
                "https://cafe.example/menu?page=2",
                "https://cafe.example/about",
            ]
        );
    }

    #[test]
    fn test_comment_urls() {
        let html = r#"<html><body>
            <!-- old page moved to /legacy/menu and https://cafe.example/archive. -->
            <!-- TODO fix spacing -->
            <p>/not-a-comment</p>
        </body></html>"#;
        let links = run(&CommentExtractor, html);
        assert!(links.contains(&"https://cafe.example/legacy/menu".to_string()));
        assert!(links.contains(&"https://cafe.example/archive".to_string()));
        assert!(!links.iter().any(|l| l.contains("not-a-comment")));
    }
}
