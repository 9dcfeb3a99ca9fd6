//! Structured-data merging
//!
//! Sources are read strictly in priority order and every stage only fills
//! gaps left by the ones before it:
//!
//! 1. JSON-LD intercepted from network responses during a dynamic render
//! 2. JSON-LD embedded in `<script type="application/ld+json">`
//! 3. Microdata (`itemscope` subtrees)
//! 4. `<meta>` tags and OpenGraph properties
//! 5. DOM heuristics for products and organization details
//!
//! A source that fails to parse is skipped and the remaining ones still run.

mod heuristics;
mod microdata;

pub use heuristics::DEFAULT_CURRENCY;
pub use microdata::{extract_microdata, MicrodataItem};

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static JSON_LD_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type]").expect("hardcoded selector is valid"));

static NAMED_META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name][content]").expect("hardcoded selector is valid"));

static PROPERTY_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property][content]").expect("hardcoded selector is valid")
});

/// `<meta name>` values kept in [`StructuredDataBundle::meta_tags`]
const META_NAMES: &[&str] = &["description", "keywords", "author", "title"];

/// A source that contributed data to a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    InterceptedJsonLd,
    JsonLd,
    Microdata,
    MetaTags,
    OpenGraph,
    Heuristic,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InterceptedJsonLd => "intercepted_json_ld",
            Self::JsonLd => "json_ld",
            Self::Microdata => "microdata",
            Self::MetaTags => "meta_tags",
            Self::OpenGraph => "open_graph",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Numeric part of the price as written on the page
    pub price: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
}

/// Everything machine-readable found on one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDataBundle {
    pub json_ld: Vec<Value>,
    pub microdata: Vec<MicrodataItem>,
    pub meta_tags: BTreeMap<String, String>,
    pub open_graph: BTreeMap<String, String>,
    pub products: Vec<Product>,
    pub organization: BTreeMap<String, String>,
    /// Contributing sources, in priority order
    pub extraction_methods: Vec<ExtractionMethod>,
}

impl StructuredDataBundle {
    pub fn is_empty(&self) -> bool {
        self.extraction_methods.is_empty()
    }

    pub fn has_method(&self, method: ExtractionMethod) -> bool {
        self.extraction_methods.contains(&method)
    }

    /// Adds one JSON-LD entity unless an earlier one already describes it
    ///
    /// Entities match on `@id`, or on `@type` plus `name`. A match only gains
    /// the keys it was missing.
    fn absorb_json_ld(&mut self, entity: Value) {
        let position = identity(&entity).and_then(|key| {
            self.json_ld
                .iter()
                .position(|known| identity(known).as_ref() == Some(&key))
        });
        match position {
            Some(index) => {
                if let (Value::Object(known), Value::Object(incoming)) =
                    (&mut self.json_ld[index], entity)
                {
                    for (key, value) in incoming {
                        known.entry(key).or_insert(value);
                    }
                }
            }
            None => {
                if !self.json_ld.contains(&entity) {
                    self.json_ld.push(entity);
                }
            }
        }
    }

    fn record(&mut self, method: ExtractionMethod, contributed: bool) {
        if contributed && !self.has_method(method) {
            self.extraction_methods.push(method);
        }
    }
}

/// Merges every structured-data source on `document` into one bundle
pub fn merge(document: &Html, intercepted_json_ld: &[Value]) -> StructuredDataBundle {
    let mut bundle = StructuredDataBundle::default();

    let intercepted = flatten(intercepted_json_ld.iter().cloned());
    bundle.record(ExtractionMethod::InterceptedJsonLd, !intercepted.is_empty());
    for entity in intercepted {
        bundle.absorb_json_ld(entity);
    }

    let embedded = embedded_json_ld(document);
    bundle.record(ExtractionMethod::JsonLd, !embedded.is_empty());
    for entity in embedded {
        bundle.absorb_json_ld(entity);
    }

    bundle.microdata = extract_microdata(document);
    bundle.record(ExtractionMethod::Microdata, !bundle.microdata.is_empty());

    bundle.meta_tags = meta_tags(document);
    bundle.record(ExtractionMethod::MetaTags, !bundle.meta_tags.is_empty());
    bundle.open_graph = open_graph(document);
    bundle.record(ExtractionMethod::OpenGraph, !bundle.open_graph.is_empty());

    bundle.products = heuristics::structured_products(&bundle.json_ld, &bundle.microdata);
    bundle.organization =
        heuristics::structured_organization(&bundle.json_ld, &bundle.microdata);

    let mut heuristic_hit = false;
    if bundle.products.is_empty() {
        bundle.products = heuristics::heuristic_products(document);
        heuristic_hit = !bundle.products.is_empty();
    }
    let known_fields = bundle.organization.len();
    if let Some(site_name) = bundle.open_graph.get("site_name") {
        bundle
            .organization
            .entry("name".to_string())
            .or_insert_with(|| site_name.clone());
    }
    heuristics::heuristic_organization(document, &mut bundle.organization);
    heuristic_hit |= bundle.organization.len() > known_fields;
    bundle.record(ExtractionMethod::Heuristic, heuristic_hit);

    bundle
}

/// Parses `html` and merges its structured data
pub fn merge_html(html: &str, intercepted_json_ld: &[Value]) -> StructuredDataBundle {
    merge(&Html::parse_document(html), intercepted_json_ld)
}

/// Parsed payloads of every `application/ld+json` script, arrays flattened
///
/// Blocks that are not valid JSON are skipped.
pub fn embedded_json_ld(document: &Html) -> Vec<Value> {
    let payloads = document
        .select(&JSON_LD_SCRIPT)
        .filter(|script| {
            script
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .filter_map(|script| {
            let raw = script.text().collect::<String>();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Skipping invalid JSON-LD block: {}", e);
                    None
                }
            }
        });
    flatten(payloads)
}

fn flatten(values: impl Iterator<Item = Value>) -> Vec<Value> {
    let mut entities = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => entities.extend(items),
            other => entities.push(other),
        }
    }
    entities
}

fn identity(entity: &Value) -> Option<String> {
    if let Some(id) = entity.get("@id").and_then(Value::as_str) {
        return Some(format!("id:{}", id));
    }
    let kind = match entity.get("@type")? {
        Value::String(t) => t.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        _ => return None,
    };
    let name = entity.get("name")?.as_str()?;
    Some(format!("{}|{}", kind, name))
}

fn meta_tags(document: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    for meta in document.select(&NAMED_META) {
        let (Some(name), Some(content)) = (meta.value().attr("name"), meta.value().attr("content"))
        else {
            continue;
        };
        let name = name.trim().to_lowercase();
        if META_NAMES.contains(&name.as_str()) && !content.trim().is_empty() {
            tags.entry(name).or_insert_with(|| content.trim().to_string());
        }
    }
    tags
}

fn open_graph(document: &Html) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for meta in document.select(&PROPERTY_META) {
        let (Some(property), Some(content)) =
            (meta.value().attr("property"), meta.value().attr("content"))
        else {
            continue;
        };
        if let Some(key) = property.trim().strip_prefix("og:") {
            if !key.is_empty() && !content.trim().is_empty() {
                properties
                    .entry(key.to_string())
                    .or_insert_with(|| content.trim().to_string());
            }
        }
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRODUCT_PAGE: &str = r#"<html><head>
        <title>Kenya AA | Corner Cafe</title>
        <meta name="description" content="Bright, juicy and floral washed Kenyan coffee">
        <meta name="viewport" content="width=device-width">
        <meta property="og:title" content="Kenya AA">
        <meta property="og:site_name" content="Corner Cafe">
        <script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Product", "name": "Kenya AA",
             "offers": {"price": "19.00", "priceCurrency": "USD"}, "description": "Embedded copy"}
        </script>
        <script type="application/ld+json">{ not json </script>
        </head><body>
        <div itemscope itemtype="https://schema.org/Product"><span itemprop="name">Kenya AA</span></div>
        </body></html>"#;

    #[test]
    fn test_intercepted_json_ld_wins_over_embedded() {
        let intercepted = vec![json!({
            "@type": "Product",
            "name": "Kenya AA",
            "offers": {"price": "21.00", "priceCurrency": "USD"}
        })];
        let bundle = merge_html(PRODUCT_PAGE, &intercepted);

        assert_eq!(bundle.json_ld.len(), 1);
        let product = &bundle.json_ld[0];
        assert_eq!(product["offers"]["price"], "21.00");
        // embedded pass only fills keys the intercepted entity lacked
        assert_eq!(product["description"], "Embedded copy");
        assert_eq!(bundle.products[0].price.as_deref(), Some("21.00"));
        assert_eq!(
            bundle.extraction_methods[..3],
            [
                ExtractionMethod::InterceptedJsonLd,
                ExtractionMethod::JsonLd,
                ExtractionMethod::Microdata
            ]
        );
    }

    #[test]
    fn test_invalid_block_skipped_and_sources_in_order() {
        let bundle = merge_html(PRODUCT_PAGE, &[]);
        assert_eq!(bundle.json_ld.len(), 1);
        assert_eq!(bundle.extraction_methods[0], ExtractionMethod::JsonLd);
        assert!(!bundle.has_method(ExtractionMethod::InterceptedJsonLd));
        assert_eq!(
            bundle.meta_tags.get("description").map(String::as_str),
            Some("Bright, juicy and floral washed Kenyan coffee")
        );
        assert!(!bundle.meta_tags.contains_key("viewport"));
        assert_eq!(bundle.open_graph["title"], "Kenya AA");
        assert_eq!(bundle.organization["name"], "Corner Cafe");
        // microdata duplicate of the JSON-LD product is not listed twice
        assert_eq!(bundle.products.len(), 1);
    }

    #[test]
    fn test_heuristic_fallback_only_without_structured_products() {
        let html = r#"<html><head><title>Corner Cafe</title></head><body>
            <div class="product-card"><h3>House Blend</h3><span class="price">$14</span></div>
        </body></html>"#;
        let bundle = merge_html(html, &[]);
        assert_eq!(bundle.products.len(), 1);
        assert_eq!(bundle.products[0].name, "House Blend");
        assert_eq!(bundle.products[0].currency.as_deref(), Some(DEFAULT_CURRENCY));
        assert_eq!(bundle.extraction_methods, vec![ExtractionMethod::Heuristic]);
    }

    #[test]
    fn test_json_ld_array_payload_flattened() {
        let html = r##"<script type="application/ld+json">
            [{"@id": "#cafe", "@type": "CafeOrCoffeeShop", "name": "Corner Cafe"},
             {"@id": "#cafe", "telephone": "555-0100"}]
        </script>"##;
        let document = Html::parse_document(html);
        assert_eq!(embedded_json_ld(&document).len(), 2);

        let bundle = merge(&document, &[]);
        assert_eq!(bundle.json_ld.len(), 1);
        assert_eq!(bundle.json_ld[0]["telephone"], "555-0100");
    }

    #[test]
    fn test_empty_page_has_no_methods() {
        let bundle = merge_html("<html><body><p>hi</p></body></html>", &[]);
        assert!(bundle.is_empty());
    }
}
