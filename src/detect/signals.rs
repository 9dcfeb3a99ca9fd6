//! Signal table for the JS-dependency detector
//!
//! Every signal is a named check with a fixed weight. Checks return the
//! evidence string when they fire, so the score is a fold over the table.

use crate::crawler::visible_text;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// One observable property of a page that shifts the JS-dependency score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    NoscriptWarning,
    MinimalContent,
    FrameworkFingerprint,
    SpaRoot,
    LoadingIndicators,
    ClientRouting,
    HeavyJavascript,
    RichContent,
    NavigationLists,
    FormPresent,
    MetaDescription,
}

/// Weights applied when a signal fires, in evaluation order
pub const SIGNAL_WEIGHTS: &[(Signal, i32)] = &[
    (Signal::NoscriptWarning, 40),
    (Signal::MinimalContent, 35),
    (Signal::FrameworkFingerprint, 25),
    (Signal::SpaRoot, 20),
    (Signal::LoadingIndicators, 15),
    (Signal::ClientRouting, 10),
    (Signal::HeavyJavascript, 8),
    (Signal::RichContent, -15),
    (Signal::NavigationLists, -10),
    (Signal::FormPresent, -5),
    (Signal::MetaDescription, -5),
];

const ENABLE_JS_PHRASES: &[&str] = &[
    "enable javascript",
    "enable js",
    "javascript is required",
    "javascript is disabled",
    "requires javascript",
    "javascript must be enabled",
    "turn on javascript",
    "need javascript",
    "javascript to run this app",
];

const FRAMEWORK_SCRIPT_MARKERS: &[&str] = &[
    "react", "vue", "angular", "ember", "svelte", "_next/", "next.js", "nuxt", "gatsby",
];

const FRAMEWORK_GENERATORS: &[&str] = &[
    "next.js", "nuxt", "gatsby", "gridsome", "vuepress", "docusaurus", "sveltekit", "astro",
];

const FRAMEWORK_API_CALLS: &[&str] = &[
    "ReactDOM.render",
    "ReactDOM.createRoot",
    "ReactDOM.hydrate",
    "new Vue(",
    "Vue.createApp",
    "angular.module",
    "Ember.Application",
    "__NEXT_DATA__",
    "__NUXT__",
];

macro_rules! selector {
    ($css:literal) => {
        LazyLock::new(|| Selector::parse($css).expect("hardcoded selector is valid"))
    };
}

const LOADING_PHRASES: &[&str] = &["loading...", "please wait", "fetching data"];

/// Word count below which a page body has no meaningful content
const MIN_WORDS: usize = 10;
const LOW_WORDS: usize = 30;
const SPARSE_WORDS: usize = 100;
const MIN_TEXT_RATIO: f64 = 0.05;

static NOSCRIPT: LazyLock<Selector> = selector!("noscript");
static BODY: LazyLock<Selector> = selector!("body");
static SCRIPT_SRC: LazyLock<Selector> = selector!("script[src]");
static INLINE_SCRIPT: LazyLock<Selector> = selector!("script:not([src])");
static GENERATOR_META: LazyLock<Selector> = selector!("meta[name][content]");
static ROOT_CANDIDATES: LazyLock<Selector> =
    selector!("div[id], div[class], main[id], main[class]");
static CLASSED: LazyLock<Selector> = selector!("[class]");
static ROUTER_ATTRS: LazyLock<Selector> = selector!("[data-router], [data-route]");
static RICH_CONTAINERS: LazyLock<Selector> = selector!("article, main, section");
static NAVIGATION: LazyLock<Selector> = selector!("nav, [role=navigation]");
static NAV_LINK: LazyLock<Selector> = selector!("a[href]");
static FORM: LazyLock<Selector> = selector!("form");
static META_DESCRIPTION: LazyLock<Selector> = selector!("meta[name=description][content]");

static SPA_ROOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(app|root|spa-root|react-root|__next)$")
        .expect("hardcoded regex pattern is valid")
});

static EMPTY_SHELL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(app|root|container|content)$").expect("hardcoded regex pattern is valid")
});

static LOADING_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(loading|spinner|skeleton|placeholder|lazy-load|shimmer)")
        .expect("hardcoded regex pattern is valid")
});

static HASH_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']#/[A-Za-z0-9_\-/]*["']"#).expect("hardcoded regex pattern is valid")
});

/// Precomputed view of a page shared by every check
pub struct PageView<'a> {
    pub document: &'a Html,
    pub raw_html: &'a str,
    /// Body text outside scripts, styles, noscript and templates
    pub body_text: String,
    pub word_count: usize,
}

impl<'a> PageView<'a> {
    pub fn new(document: &'a Html, raw_html: &'a str) -> Self {
        let body_text = document
            .select(&BODY)
            .next()
            .map(|body| visible_text(body, &["script", "style", "noscript", "template"]))
            .unwrap_or_default();
        let word_count = body_text.split_whitespace().count();
        Self {
            document,
            raw_html,
            body_text,
            word_count,
        }
    }

    fn inline_scripts(&self) -> Vec<String> {
        self.document
            .select(&INLINE_SCRIPT)
            .map(|script| script.text().collect::<String>())
            .collect()
    }
}

impl Signal {
    pub fn weight(self) -> i32 {
        SIGNAL_WEIGHTS
            .iter()
            .find(|(signal, _)| *signal == self)
            .map(|(_, weight)| *weight)
            .unwrap_or(0)
    }

    /// Signals strong enough to justify rendering at the conservative threshold
    pub fn is_strong(self) -> bool {
        matches!(self, Signal::NoscriptWarning | Signal::MinimalContent)
    }

    /// Returns the evidence string if this signal fires on the page
    pub fn check(self, page: &PageView<'_>) -> Option<String> {
        match self {
            Signal::NoscriptWarning => noscript_warning(page),
            Signal::MinimalContent => minimal_content(page),
            Signal::FrameworkFingerprint => framework_fingerprint(page),
            Signal::SpaRoot => spa_root(page),
            Signal::LoadingIndicators => loading_indicators(page),
            Signal::ClientRouting => client_routing(page),
            Signal::HeavyJavascript => heavy_javascript(page),
            Signal::RichContent => rich_content(page),
            Signal::NavigationLists => navigation_lists(page),
            Signal::FormPresent => form_present(page),
            Signal::MetaDescription => meta_description(page),
        }
    }
}

fn tokens<'e>(element: &'e scraper::node::Element) -> impl Iterator<Item = &'e str> {
    element
        .id()
        .into_iter()
        .chain(element.classes())
}

fn noscript_warning(page: &PageView<'_>) -> Option<String> {
    page.document.select(&NOSCRIPT).find_map(|noscript| {
        let text = noscript.text().collect::<String>().to_lowercase();
        ENABLE_JS_PHRASES
            .iter()
            .find(|phrase| text.contains(*phrase))
            .map(|phrase| format!("noscript says \"{}\"", phrase))
    })
}

fn minimal_content(page: &PageView<'_>) -> Option<String> {
    if page.word_count < MIN_WORDS {
        return Some(format!("only {} words of body text", page.word_count));
    }

    let ratio = page.body_text.len() as f64 / page.raw_html.len().max(1) as f64;
    if page.word_count < LOW_WORDS && ratio < MIN_TEXT_RATIO {
        return Some(format!(
            "{} words at {:.1}% text-to-markup ratio",
            page.word_count,
            ratio * 100.0
        ));
    }

    if page.word_count < SPARSE_WORDS {
        let empty_shell = page.document.select(&ROOT_CANDIDATES).find(|element| {
            tokens(element.value()).any(|name| EMPTY_SHELL_NAME.is_match(name))
                && element.text().collect::<String>().trim().is_empty()
                && element.children().filter(|c| c.value().is_element()).count() < 3
        });
        if let Some(shell) = empty_shell {
            return Some(format!(
                "{} words with empty <{}> container",
                page.word_count,
                shell.value().name()
            ));
        }
    }

    None
}

fn framework_fingerprint(page: &PageView<'_>) -> Option<String> {
    for script in page.document.select(&SCRIPT_SRC) {
        let src = script.value().attr("src").unwrap_or_default().to_lowercase();
        if let Some(marker) = FRAMEWORK_SCRIPT_MARKERS.iter().find(|m| src.contains(*m)) {
            return Some(format!("framework script {} ({})", src, marker));
        }
    }

    for meta in page.document.select(&GENERATOR_META) {
        let element = meta.value();
        let name = element.attr("name").unwrap_or_default().to_lowercase();
        let content = element.attr("content").unwrap_or_default().to_lowercase();
        if name == "next-head-count" {
            return Some("next.js head marker".to_string());
        }
        if name == "generator" {
            if let Some(generator) = FRAMEWORK_GENERATORS.iter().find(|g| content.contains(*g)) {
                return Some(format!("generator meta {}", generator));
            }
        }
    }

    page.inline_scripts().iter().find_map(|body| {
        FRAMEWORK_API_CALLS
            .iter()
            .find(|call| body.contains(*call))
            .map(|call| format!("framework call {}", call))
    })
}

fn spa_root(page: &PageView<'_>) -> Option<String> {
    page.document.select(&ROOT_CANDIDATES).find_map(|element| {
        let value = element.value();
        let name = tokens(value).find(|name| SPA_ROOT_NAME.is_match(name))?;
        let text_len = element.text().collect::<String>().trim().len();
        let children = element.children().filter(|c| c.value().is_element()).count();
        let react_root = value.attr("data-reactroot").is_some();
        (text_len < 50 && (children < 5 || react_root))
            .then(|| format!("SPA mount point <{} {}>", value.name(), name))
    })
}

fn loading_indicators(page: &PageView<'_>) -> Option<String> {
    for element in page.document.select(&CLASSED) {
        if let Some(class) = element.value().classes().find(|c| LOADING_CLASS.is_match(c)) {
            return Some(format!("loading class .{}", class));
        }
    }

    let text = page.body_text.to_lowercase();
    LOADING_PHRASES
        .iter()
        .find(|phrase| text.contains(*phrase))
        .map(|phrase| format!("loading text \"{}\"", phrase))
}

fn client_routing(page: &PageView<'_>) -> Option<String> {
    if HASH_ROUTE.is_match(page.raw_html) {
        return Some("hash-based routes".to_string());
    }
    if page.document.select(&ROUTER_ATTRS).next().is_some() {
        return Some("router data attributes".to_string());
    }
    page.inline_scripts()
        .iter()
        .any(|body| body.contains("pushState"))
        .then(|| "history.pushState navigation".to_string())
}

fn heavy_javascript(page: &PageView<'_>) -> Option<String> {
    let external = page.document.select(&SCRIPT_SRC).count();
    if external > 10 {
        return Some(format!("{} external scripts", external));
    }

    let inline = page.inline_scripts();
    let inline_bytes: usize = inline.iter().map(String::len).sum();
    if inline_bytes > 50 * 1024 || (inline.len() > 5 && inline_bytes > 10 * 1024) {
        return Some(format!(
            "{} inline scripts totaling {} bytes",
            inline.len(),
            inline_bytes
        ));
    }

    None
}

fn rich_content(page: &PageView<'_>) -> Option<String> {
    page.document.select(&RICH_CONTAINERS).find_map(|element| {
        let len = visible_text(element, &["script", "style", "noscript", "template"])
            .trim()
            .len();
        (len > 200).then(|| format!("<{}> with {} chars of text", element.value().name(), len))
    })
}

fn navigation_lists(page: &PageView<'_>) -> Option<String> {
    page.document.select(&NAVIGATION).find_map(|nav| {
        let links = nav.select(&NAV_LINK).count();
        (links > 3).then(|| format!("navigation with {} links", links))
    })
}

fn form_present(page: &PageView<'_>) -> Option<String> {
    page.document
        .select(&FORM)
        .next()
        .map(|_| "static form present".to_string())
}

fn meta_description(page: &PageView<'_>) -> Option<String> {
    page.document.select(&META_DESCRIPTION).find_map(|meta| {
        let len = meta.value().attr("content").unwrap_or_default().trim().len();
        (len > 50).then(|| format!("meta description of {} chars", len))
    })
}
