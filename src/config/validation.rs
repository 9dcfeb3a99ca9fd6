use crate::config::types::{
    CrawlConfig, CrawlerConfig, FilterConfig, JsDetectionConfig, RenderConfig,
};
use crate::{ConfigError, ConfigResult};
use std::collections::BTreeSet;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_filter_config(&config.filters)?;
    validate_render_config(&config.rendering)?;
    validate_js_detection_config(&config.js_detection)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates extension lists
fn validate_filter_config(config: &FilterConfig) -> ConfigResult<()> {
    validate_extensions("allowed_extensions", &config.allowed_extensions)?;
    validate_extensions("blocked_extensions", &config.blocked_extensions)?;
    Ok(())
}

fn validate_extensions(field: &str, extensions: &BTreeSet<String>) -> ConfigResult<()> {
    for ext in extensions {
        if !ext.is_empty() && !ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "{} entries must start with '.', got '{}'",
                field, ext
            )));
        }

        if ext.chars().any(|c| c == '/' || c.is_whitespace()) {
            return Err(ConfigError::Validation(format!(
                "{} entry '{}' contains invalid characters",
                field, ext
            )));
        }
    }
    Ok(())
}

/// Validates rendering configuration
fn validate_render_config(config: &RenderConfig) -> ConfigResult<()> {
    if config.render_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "render_timeout_ms must be >= 100ms, got {}ms",
            config.render_timeout_ms
        )));
    }

    if let Some(selector) = &config.wait_for_selector {
        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "wait_for_selector '{}' is not a valid CSS selector",
                selector
            )));
        }
    }

    Ok(())
}

/// Validates JS-detection thresholds
fn validate_js_detection_config(config: &JsDetectionConfig) -> ConfigResult<()> {
    if config.min_score <= 0 {
        return Err(ConfigError::Validation(format!(
            "min_score must be > 0, got {}",
            config.min_score
        )));
    }

    if config.conservative_score > config.min_score {
        return Err(ConfigError::Validation(format!(
            "conservative_score ({}) cannot exceed min_score ({})",
            config.conservative_score, config.min_score
        )));
    }

    Ok(())
}
