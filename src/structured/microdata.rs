//! HTML microdata (`itemscope`/`itemprop`) extraction

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ITEM_SCOPE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope]").expect("hardcoded selector is valid"));

static ITEM_PROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemprop]").expect("hardcoded selector is valid"));

/// One top-level `itemscope` with its properties
///
/// Properties that occur more than once collapse into a JSON array. Nested
/// items appear as objects with `type` and `properties` keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MicrodataItem {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub properties: BTreeMap<String, Value>,
}

impl MicrodataItem {
    /// True when `itemtype` ends with `/{name}`, e.g. `https://schema.org/Product`
    pub fn is_type(&self, name: &str) -> bool {
        self.item_type.as_deref().is_some_and(|t| {
            t.split_whitespace()
                .any(|t| t.rsplit('/').next() == Some(name))
        })
    }

    /// First string value of a property
    pub fn text(&self, property: &str) -> Option<&str> {
        match self.properties.get(property)? {
            Value::String(s) => Some(s.as_str()),
            Value::Array(values) => values.iter().find_map(Value::as_str),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "type".to_string(),
            self.item_type.clone().map_or(Value::Null, Value::String),
        );
        object.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone().into_iter().collect()),
        );
        Value::Object(object)
    }
}

/// Collects every top-level microdata item in document order
///
/// Items with neither a type nor any property are dropped.
pub fn extract_microdata(document: &Html) -> Vec<MicrodataItem> {
    document
        .select(&ITEM_SCOPE)
        .filter(|scope| scope.value().attr("itemprop").is_none())
        .map(read_item)
        .filter(|item| item.item_type.is_some() || !item.properties.is_empty())
        .collect()
}

fn read_item(scope: ElementRef<'_>) -> MicrodataItem {
    let mut properties: BTreeMap<String, Value> = BTreeMap::new();

    for element in scope.select(&ITEM_PROP) {
        if element.id() == scope.id() || !is_owned_by(element, scope) {
            continue;
        }
        let value = if element.value().attr("itemscope").is_some() {
            read_item(element).to_value()
        } else {
            Value::String(property_value(element))
        };
        let Some(names) = element.value().attr("itemprop") else {
            continue;
        };
        for name in names.split_whitespace() {
            add_property(&mut properties, name, value.clone());
        }
    }

    MicrodataItem {
        item_type: element_attr(scope, "itemtype"),
        properties,
    }
}

fn add_property(properties: &mut BTreeMap<String, Value>, name: &str, value: Value) {
    match properties.get_mut(name) {
        None => {
            properties.insert(name.to_string(), value);
        }
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Whether `scope` is the nearest ancestor of `element` carrying `itemscope`
fn is_owned_by(element: ElementRef<'_>, scope: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().attr("itemscope").is_some())
        .is_some_and(|owner| owner.id() == scope.id())
}

/// Property value per the HTML microdata value rules
fn property_value(element: ElementRef<'_>) -> String {
    let attr = match element.value().name() {
        "meta" => "content",
        "a" | "area" | "link" => "href",
        "img" | "audio" | "video" | "source" | "iframe" | "embed" | "track" => "src",
        "object" => "data",
        "time" => "datetime",
        "data" | "meter" => "value",
        _ => "content",
    };
    element_attr(element, attr).unwrap_or_else(|| {
        element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn element_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
