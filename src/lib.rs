//! Brewcrawl: a single-site crawler with JavaScript-rendering fallback
//!
//! This crate discovers and retrieves the pages of one website, extracts
//! navigable links through eleven independent strategies, decides per page
//! whether a static fetch is enough or a headless-browser render is needed,
//! and merges the structured data embedded in each page.

pub mod config;
pub mod crawler;
pub mod detect;
pub mod links;
pub mod output;
pub mod render;
pub mod state;
pub mod structured;
pub mod url;

use thiserror::Error;

/// Main error type for Brewcrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Headless-browser rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Browser error: {0}")]
    Browser(#[from] anyhow::Error),
}

/// Result type alias for Brewcrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for rendering operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{crawl, discover_links, CrawlResult, CrawledPage, FetchedPage, RenderingMethod};
pub use detect::{Confidence, JsDependencyVerdict};
pub use links::{DiscoveryMethod, LinkRecord, LinkType};
pub use output::{DiscoveryResult, LinkStatus};
pub use state::PageState;
pub use structured::StructuredDataBundle;
pub use url::{is_valid_url, normalize_url, smart_join};
