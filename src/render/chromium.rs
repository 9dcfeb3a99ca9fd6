//! Chromium-based renderer using chromiumoxide

use super::{NavigationResult, RenderContext, Renderer};
use crate::{RenderError, RenderResult};
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Interval between selector and idle polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path
pub fn find_chromium() -> Option<PathBuf> {
    // 1. BREWCRAWL_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("BREWCRAWL_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.brewcrawl/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".brewcrawl/chromium/chrome-linux64/chrome"),
            home.join(".brewcrawl/chromium/chrome"),
        ];
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer, one shared browser for the whole crawl
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Create a new ChromiumRenderer, launching a headless Chromium instance
    pub async fn new() -> RenderResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            RenderError::Unavailable(
                "Chromium not found; set BREWCRAWL_CHROMIUM_PATH".to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| RenderError::Unavailable(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            traffic: Arc::new(Mutex::new(Traffic::new())),
            listener: None,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> RenderResult<()> {
        self.handler.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Responses observed on one page
#[derive(Debug)]
struct Traffic {
    /// Status of the first HTML response, the main document
    document_status: Option<u16>,
    json_ld_requests: Vec<RequestId>,
    last_response: Instant,
}

impl Traffic {
    fn new() -> Self {
        Self {
            document_status: None,
            json_ld_requests: Vec::new(),
            last_response: Instant::now(),
        }
    }

    fn observe(&mut self, event: &EventResponseReceived) {
        self.last_response = Instant::now();
        let mime = event.response.mime_type.to_lowercase();
        if self.document_status.is_none()
            && (mime.starts_with("text/html") || mime.starts_with("application/xhtml+xml"))
        {
            self.document_status = u16::try_from(event.response.status).ok();
        }
        if mime.contains("application/ld+json") {
            self.json_ld_requests.push(event.request_id.clone());
        }
    }
}

/// A single Chromium page context
pub struct ChromiumContext {
    page: Page,
    traffic: Arc<Mutex<Traffic>>,
    listener: Option<JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn start_listening(&mut self) -> RenderResult<()> {
        self.page
            .execute(EnableParams::default())
            .await
            .context("failed to enable network events")?;
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to responses")?;

        let traffic = Arc::clone(&self.traffic);
        self.listener = Some(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if let Ok(mut traffic) = traffic.lock() {
                    traffic.observe(&event);
                }
            }
        }));
        Ok(())
    }

    fn with_traffic<T>(&self, read: impl FnOnce(&Traffic) -> T) -> RenderResult<T> {
        self.traffic
            .lock()
            .map(|traffic| read(&traffic))
            .map_err(|_| RenderError::Browser(anyhow::anyhow!("response log poisoned")))
    }

    async fn response_body(&self, request_id: RequestId) -> anyhow::Result<String> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(request_id))
            .await
            .context("failed to read response body")?;
        let body = &response.result;
        if body.base64_encoded {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&body.body)
                .context("invalid base64 response body")?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            Ok(body.body.clone())
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> RenderResult<NavigationResult> {
        if let Err(e) = self.start_listening().await {
            tracing::warn!("Response interception unavailable for {}: {}", url, e);
        }
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());
                let status = self.with_traffic(|t| t.document_status)?.unwrap_or(200);

                Ok(NavigationResult {
                    final_url,
                    status,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> RenderResult<bool> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_network_idle(&self, idle: Duration, timeout_ms: u64) -> RenderResult<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let quiet_for = self.with_traffic(|t| t.last_response.elapsed())?;
            if quiet_for >= idle {
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::debug!("Network never went idle within {}ms", timeout_ms);
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn get_html(&self) -> RenderResult<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn intercepted_json_ld(&self) -> RenderResult<Vec<serde_json::Value>> {
        let requests = self.with_traffic(|t| t.json_ld_requests.clone())?;
        let mut payloads = Vec::new();
        for request_id in requests {
            let body = match self.response_body(request_id).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Skipping intercepted JSON-LD: {:#}", e);
                    continue;
                }
            };
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(serde_json::Value::Array(items)) => payloads.extend(items),
                Ok(value) => payloads.push(value),
                Err(e) => tracing::warn!("Skipping invalid intercepted JSON-LD: {}", e),
            }
        }
        Ok(payloads)
    }

    async fn close(self: Box<Self>) -> RenderResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Some(listener) = &self.listener {
            listener.abort();
        }
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_data_url() {
        let renderer = ChromiumRenderer::new()
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        let nav = ctx
            .navigate("data:text/html,<h1>Espresso</h1><p>Bar</p>", 10000)
            .await
            .expect("navigation failed");
        assert!(nav.status < 400);

        assert!(ctx.wait_for_selector("h1", 2000).await.expect("poll failed"));
        assert!(!ctx.wait_for_selector("#missing", 300).await.expect("poll failed"));

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("<h1>Espresso</h1>"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }

    #[test]
    fn test_find_chromium_honours_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        std::env::set_var("BREWCRAWL_CHROMIUM_PATH", &fake);
        assert_eq!(find_chromium(), Some(fake));
        std::env::remove_var("BREWCRAWL_CHROMIUM_PATH");
    }
}
