//! Named configuration presets
//!
//! Each preset is a complete value built from the defaults; nothing mutates a
//! shared config after construction.

use crate::config::types::{
    CrawlConfig, CrawlerConfig, ExtractionConfig, FilterConfig, JsDetectionConfig, RenderConfig,
};
use crate::{ConfigError, ConfigResult};

impl CrawlConfig {
    /// Wide, fast crawl: more pages and workers, every extractor, eager rendering
    pub fn aggressive() -> Self {
        Self {
            crawler: CrawlerConfig {
                max_pages: 500,
                max_workers: 10,
                request_delay_ms: 250,
                ..CrawlerConfig::default()
            },
            filters: FilterConfig::default(),
            extraction: ExtractionConfig::all(true),
            rendering: RenderConfig::default(),
            js_detection: JsDetectionConfig {
                min_score: 40,
                conservative_score: 30,
                strict_mode: false,
            },
        }
    }

    /// Slow, polite crawl that renders only clearly JS-dependent pages
    pub fn conservative() -> Self {
        Self {
            crawler: CrawlerConfig {
                max_pages: 50,
                max_workers: 2,
                request_delay_ms: 3000,
                ..CrawlerConfig::default()
            },
            filters: FilterConfig::default(),
            extraction: ExtractionConfig {
                comments: false,
                css: false,
                ..ExtractionConfig::default()
            },
            rendering: RenderConfig::default(),
            js_detection: JsDetectionConfig {
                strict_mode: true,
                ..JsDetectionConfig::default()
            },
        }
    }

    /// Settings tuned for small coffee shop and cafe sites
    pub fn coffee_site(max_pages: usize) -> Self {
        Self {
            crawler: CrawlerConfig {
                max_pages,
                max_workers: 3,
                request_delay_ms: 1500,
                ..CrawlerConfig::default()
            },
            filters: FilterConfig {
                follow_external_links: false,
                ..FilterConfig::default()
            },
            extraction: ExtractionConfig {
                javascript: true,
                ..ExtractionConfig::default()
            },
            rendering: RenderConfig::default(),
            js_detection: JsDetectionConfig::default(),
        }
    }

    /// Looks up a preset by name
    pub fn from_preset(name: &str) -> ConfigResult<Self> {
        match name {
            "default" => Ok(Self::default()),
            "aggressive" => Ok(Self::aggressive()),
            "conservative" => Ok(Self::conservative()),
            "coffee" => Ok(Self::coffee_site(CrawlerConfig::default().max_pages)),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }
}
