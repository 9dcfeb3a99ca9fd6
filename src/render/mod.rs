//! Headless-browser rendering for JavaScript-dependent pages
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over the
//! browser engine (Chromium via chromiumoxide), plus [`render_dynamic`],
//! which drives one context through navigate, wait, settle and read.

pub mod chromium;

pub use chromium::{find_chromium, ChromiumRenderer};

use crate::config::RenderConfig;
use crate::{RenderError, RenderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quiet period with no network responses that counts as idle
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Fixed delay after the waits, before the DOM is read
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Result of navigating to a URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects
    pub final_url: String,
    /// HTTP status of the main document
    pub status: u16,
    /// Time taken to load the page in milliseconds
    pub load_time_ms: u64,
}

/// Output of a successful dynamic render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
    /// Parsed bodies of `application/ld+json` responses seen during the load
    pub intercepted_json_ld: Vec<serde_json::Value>,
}

/// A browser engine that can create rendering contexts
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab)
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>>;
    /// Shut down the browser engine
    async fn shutdown(&self) -> RenderResult<()>;
    /// Number of currently active contexts
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> RenderResult<NavigationResult>;
    /// Poll for `selector`; false when it never appeared within the timeout
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> RenderResult<bool>;
    /// Wait until no response has arrived for `idle`, bounded by the timeout
    async fn wait_for_network_idle(&self, idle: Duration, timeout_ms: u64) -> RenderResult<()>;
    /// Get the full page HTML
    async fn get_html(&self) -> RenderResult<String>;
    /// JSON-LD payloads intercepted since navigation started
    async fn intercepted_json_ld(&self) -> RenderResult<Vec<serde_json::Value>>;
    /// Close this context
    async fn close(self: Box<Self>) -> RenderResult<()>;
}

/// A no-op renderer used when dynamic rendering is disabled or Chromium is
/// unavailable. Every render attempt fails, so callers keep the static result.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        Err(RenderError::Unavailable(
            "browser not available, static-only mode".to_string(),
        ))
    }
    async fn shutdown(&self) -> RenderResult<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

/// Launches Chromium when rendering is enabled, falling back to [`NoopRenderer`]
pub async fn launch_renderer(config: &RenderConfig) -> Box<dyn Renderer> {
    if !config.enable_dynamic_rendering {
        return Box::new(NoopRenderer);
    }
    match ChromiumRenderer::new().await {
        Ok(renderer) => {
            tracing::info!("Headless Chromium launched for dynamic rendering");
            Box::new(renderer)
        }
        Err(e) => {
            tracing::warn!("Dynamic rendering disabled: {}", e);
            Box::new(NoopRenderer)
        }
    }
}

/// Renders `url` in a fresh context of `renderer`
///
/// The context is closed on every path. Navigation failures, timeouts and
/// main-document statuses of 400 or above are errors; a selector that never
/// appears is only logged.
pub async fn render_dynamic(
    renderer: &dyn Renderer,
    url: &str,
    config: &RenderConfig,
) -> RenderResult<RenderedPage> {
    let mut context = renderer.new_context().await?;
    let outcome = render_in_context(context.as_mut(), url, config).await;
    if let Err(e) = context.close().await {
        tracing::warn!("Failed to close render context for {}: {}", url, e);
    }
    outcome
}

async fn render_in_context(
    context: &mut dyn RenderContext,
    url: &str,
    config: &RenderConfig,
) -> RenderResult<RenderedPage> {
    let timeout_ms = config.render_timeout_ms;
    let navigation = context.navigate(url, timeout_ms).await?;
    if navigation.status >= 400 {
        return Err(RenderError::HttpStatus {
            url: url.to_string(),
            status: navigation.status,
        });
    }
    tracing::debug!(
        "Rendered {} -> {} (HTTP {}, {}ms)",
        url,
        navigation.final_url,
        navigation.status,
        navigation.load_time_ms
    );

    if let Some(selector) = config.wait_for_selector.as_deref() {
        if !context.wait_for_selector(selector, timeout_ms).await? {
            tracing::warn!("Selector '{}' never appeared on {}", selector, url);
        }
    }
    if config.wait_for_network_idle {
        context
            .wait_for_network_idle(NETWORK_IDLE_WINDOW, timeout_ms)
            .await?;
    }
    tokio::time::sleep(SETTLE_DELAY).await;

    let html = context.get_html().await?;
    let intercepted_json_ld = context.intercepted_json_ld().await?;
    Ok(RenderedPage {
        html,
        final_url: navigation.final_url,
        intercepted_json_ld,
    })
}
