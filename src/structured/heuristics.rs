//! Products and organization details read from structured sources, with
//! CSS-selector heuristics filling whatever those sources left empty

use super::microdata::MicrodataItem;
use super::Product;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PRODUCT_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[class*="product"], [class*="item"], [class*="menu-item"], [data-product], [itemtype$="/Product"]"#,
    )
    .expect("hardcoded selector is valid")
});

static PRODUCT_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h1, h2, h3, h4, h5, h6, .name, .title, [itemprop="name"]"#)
        .expect("hardcoded selector is valid")
});

static PRODUCT_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="price"], [itemprop="price"]"#).expect("hardcoded selector is valid")
});

static PRODUCT_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="description"], [itemprop="description"], p"#)
        .expect("hardcoded selector is valid")
});

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("hardcoded selector is valid"));

static CONTACT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"a[href^="tel:"], [class*="phone"], [class*="contact"], [itemprop="telephone"], footer"#,
    )
    .expect("hardcoded selector is valid")
});

static ADDRESS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"address, [class*="address"], [itemprop="address"]"#)
        .expect("hardcoded selector is valid")
});

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?(\d+\.?\d*)").expect("hardcoded regex pattern is valid"));

static DOLLAR_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+\.?\d*)").expect("hardcoded regex pattern is valid"));

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
        .expect("hardcoded regex pattern is valid")
});

pub const DEFAULT_CURRENCY: &str = "USD";

/// Descriptions shorter than this are treated as labels, not prose
const MIN_DESCRIPTION_CHARS: usize = 20;

/// Plausible length range for a street address
const ADDRESS_CHARS: std::ops::RangeInclusive<usize> = 10..=200;

/// schema.org types that describe the site's owner
const ORGANIZATION_TYPES: &[&str] = &[
    "Organization",
    "LocalBusiness",
    "FoodEstablishment",
    "CafeOrCoffeeShop",
    "Restaurant",
    "Bakery",
    "Store",
];

/// Products declared as JSON-LD or microdata `Product` entities
pub fn structured_products(json_ld: &[Value], microdata: &[MicrodataItem]) -> Vec<Product> {
    let from_json_ld = entities(json_ld)
        .filter(|entity| has_type(entity, &["Product"]))
        .filter_map(product_from_json_ld);
    let from_microdata = microdata
        .iter()
        .filter(|item| item.is_type("Product"))
        .filter_map(product_from_microdata);

    let mut products = Vec::new();
    for product in from_json_ld.chain(from_microdata) {
        push_unique(&mut products, product);
    }
    products
}

/// Organization fields from JSON-LD or microdata business entities
pub fn structured_organization(
    json_ld: &[Value],
    microdata: &[MicrodataItem],
) -> BTreeMap<String, String> {
    let mut organization = BTreeMap::new();

    for entity in entities(json_ld).filter(|e| has_type(e, ORGANIZATION_TYPES)) {
        fill(&mut organization, "name", entity.get("name").and_then(Value::as_str));
        fill(&mut organization, "phone", entity.get("telephone").and_then(Value::as_str));
        fill(&mut organization, "url", entity.get("url").and_then(Value::as_str));
        fill(
            &mut organization,
            "address",
            entity.get("address").and_then(address_text).as_deref(),
        );
    }
    for item in microdata
        .iter()
        .filter(|item| ORGANIZATION_TYPES.iter().any(|t| item.is_type(t)))
    {
        fill(&mut organization, "name", item.text("name"));
        fill(&mut organization, "phone", item.text("telephone"));
        fill(&mut organization, "url", item.text("url"));
        fill(
            &mut organization,
            "address",
            item.properties.get("address").and_then(address_text).as_deref(),
        );
    }
    organization
}

/// Product-like elements found by class and attribute patterns
///
/// A candidate needs exactly one name element, so list wrappers around
/// several cards are skipped in favour of the cards themselves.
pub fn heuristic_products(document: &Html) -> Vec<Product> {
    let mut products = Vec::new();
    for candidate in document.select(&PRODUCT_CANDIDATES) {
        let names: Vec<String> = candidate
            .select(&PRODUCT_NAME)
            .filter(|el| el.id() != candidate.id())
            .map(text_of)
            .filter(|name| !name.is_empty())
            .collect();
        let [name] = names.as_slice() else {
            continue;
        };

        let price = candidate
            .select(&PRODUCT_PRICE)
            .find_map(|el| capture(&PRICE, &text_of(el)))
            .or_else(|| capture(&DOLLAR_PRICE, &text_of(candidate)));
        let description = candidate
            .select(&PRODUCT_DESCRIPTION)
            .map(text_of)
            .find(|text| text.chars().count() > MIN_DESCRIPTION_CHARS);
        if price.is_none() && description.is_none() {
            continue;
        }

        push_unique(
            &mut products,
            Product {
                name: name.clone(),
                currency: price.as_ref().map(|_| DEFAULT_CURRENCY.to_string()),
                price,
                description,
            },
        );
    }
    products
}

/// Fills gaps in `organization` from the title, phone and address patterns
pub fn heuristic_organization(document: &Html, organization: &mut BTreeMap<String, String>) {
    let title = document.select(&TITLE).next().map(text_of);
    fill(organization, "name", title.as_deref().filter(|t| !t.is_empty()));

    let phone = document.select(&CONTACT).find_map(|el| {
        el.value()
            .attr("href")
            .and_then(|href| href.strip_prefix("tel:"))
            .map(str::to_string)
            .or_else(|| PHONE.find(&text_of(el)).map(|m| m.as_str().to_string()))
    });
    fill(organization, "phone", phone.as_deref());

    let address = document
        .select(&ADDRESS)
        .map(text_of)
        .find(|text| ADDRESS_CHARS.contains(&text.chars().count()));
    fill(organization, "address", address.as_deref());
}

/// Top-level entities plus the members of any `@graph`
fn entities(json_ld: &[Value]) -> impl Iterator<Item = &Value> {
    json_ld.iter().flat_map(|value| {
        let graph = value
            .get("@graph")
            .and_then(Value::as_array)
            .map(|members| members.iter())
            .into_iter()
            .flatten();
        std::iter::once(value).chain(graph)
    })
}

fn has_type(entity: &Value, wanted: &[&str]) -> bool {
    match entity.get("@type") {
        Some(Value::String(t)) => wanted.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| wanted.contains(&t)),
        _ => false,
    }
}

fn product_from_json_ld(entity: &Value) -> Option<Product> {
    let name = entity.get("name")?.as_str()?.trim().to_string();
    let offer = match entity.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    let price = offer.and_then(|o| o.get("price")).and_then(scalar_text);
    let currency = offer
        .and_then(|o| o.get("priceCurrency"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| price.as_ref().map(|_| DEFAULT_CURRENCY.to_string()));
    Some(Product {
        name,
        price,
        currency,
        description: entity
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn product_from_microdata(item: &MicrodataItem) -> Option<Product> {
    let name = item.text("name")?.to_string();
    let offer = item
        .properties
        .get("offers")
        .and_then(|o| o.get("properties"));
    let price = offer
        .and_then(|o| o.get("price"))
        .and_then(scalar_text)
        .or_else(|| item.text("price").map(str::to_string));
    let currency = offer
        .and_then(|o| o.get("priceCurrency"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| price.as_ref().map(|_| DEFAULT_CURRENCY.to_string()));
    Some(Product {
        name,
        price,
        currency,
        description: item.text("description").map(str::to_string),
    })
}

fn address_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(fields) => {
            let parts: Vec<&str> = [
                "streetAddress",
                "addressLocality",
                "addressRegion",
                "postalCode",
            ]
            .iter()
            .filter_map(|key| fields.get(*key).and_then(Value::as_str))
            .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn push_unique(products: &mut Vec<Product>, product: Product) {
    if !products.iter().any(|p| p.name == product.name) {
        products.push(product);
    }
}

fn fill(map: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        map.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_menu_cards() {
        let document = Html::parse_document(
            r#"<html><body><ul class="menu-items">
                <li class="menu-item"><h3>Cortado</h3><span class="price">$4.50</span></li>
                <li class="menu-item"><h3>Cold Brew</h3><span class="price">5</span>
                    <p>Steeped for eighteen hours in small batches</p></li>
                <li class="menu-item"><h3>Water</h3></li>
            </ul></body></html>"#,
        );
        let products = heuristic_products(&document);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Cortado");
        assert_eq!(products[0].price.as_deref(), Some("4.50"));
        assert_eq!(products[0].currency.as_deref(), Some("USD"));
        assert_eq!(products[1].name, "Cold Brew");
        assert_eq!(products[1].price.as_deref(), Some("5"));
        assert!(products[1].description.as_deref().unwrap().starts_with("Steeped"));
    }

    #[test]
    fn test_short_description_ignored() {
        let document = Html::parse_document(
            r#"<div class="product"><h2>Mug</h2><p>Ceramic</p></div>"#,
        );
        assert!(heuristic_products(&document).is_empty());
    }

    #[test]
    fn test_json_ld_products_and_graph() {
        let json_ld = vec![json!({
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "Product", "name": "Kenya AA", "offers": {"price": 21, "priceCurrency": "CAD"}},
                {"@type": "CafeOrCoffeeShop", "name": "Corner Cafe", "telephone": "555-010-0199",
                 "address": {"streetAddress": "1 Bean St", "addressLocality": "Portland"}}
            ]
        })];
        let products = structured_products(&json_ld, &[]);
        assert_eq!(products[0].price.as_deref(), Some("21"));
        assert_eq!(products[0].currency.as_deref(), Some("CAD"));

        let organization = structured_organization(&json_ld, &[]);
        assert_eq!(organization["name"], "Corner Cafe");
        assert_eq!(organization["address"], "1 Bean St, Portland");
    }

    #[test]
    fn test_heuristic_organization_fills_gaps_only() {
        let document = Html::parse_document(
            r#"<html><head><title>Corner Cafe | Home</title></head><body>
                <div class="contact">Call us: (503) 555-0199</div>
                <address>1 Bean St, Portland, OR 97201</address>
            </body></html>"#,
        );
        let mut organization = BTreeMap::from([("name".to_string(), "Corner Cafe".to_string())]);
        heuristic_organization(&document, &mut organization);
        assert_eq!(organization["name"], "Corner Cafe");
        assert_eq!(organization["phone"], "(503) 555-0199");
        assert_eq!(organization["address"], "1 Bean St, Portland, OR 97201");
    }
}
