//! Configuration module for Brewcrawl
//!
//! This module handles loading, parsing, validating and presetting crawl
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use brewcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod presets;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlConfig, CrawlerConfig, ExtractionConfig, FilterConfig, JsDetectionConfig, RenderConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
