//! Headless Chrome session management.
//!
//! Every fetch owns one short-lived browser process: launch, render one
//! page, tear down. Sessions are never shared between concurrent fetches,
//! so there is no cross-request browser state to coordinate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::seq::IndexedRandom;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::types::RenderedPage;

/// Browser user-agents rotated per session.
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

/// Poll interval for ready-selector checks.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Locate a Chrome/Chromium binary.
///
/// Order: the explicitly configured path, then `PATH` lookups, then the
/// fixed container paths used by buildpack deployments.
#[must_use]
pub fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "configured Chrome binary does not exist");
    }

    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    for candidate in [
        "/app/.chrome-for-testing/chrome-linux64/chrome",
        "/app/.apt/usr/bin/google-chrome",
    ] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// One exclusive headless Chrome process plus its CDP event pump.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launches a headless Chrome instance with a randomized user-agent.
    ///
    /// # Errors
    ///
    /// [`ScraperError::BrowserUnavailable`] when no binary can be found or
    /// the process fails to start. This is fatal for the current request
    /// and is not retried here.
    pub async fn launch(chrome_binary: Option<&Path>) -> Result<Self, ScraperError> {
        let chrome_path =
            find_chrome(chrome_binary).ok_or_else(|| ScraperError::BrowserUnavailable {
                reason: "no Chrome/Chromium binary found".to_string(),
            })?;
        tracing::debug!(path = %chrome_path.display(), "launching headless Chrome");

        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(|reason| ScraperError::BrowserUnavailable { reason })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| ScraperError::BrowserUnavailable {
                    reason: e.to_string(),
                })?;

        // Drain CDP events for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Renders `url` and returns a DOM/text snapshot.
    ///
    /// The whole render is bounded by `timeout`. A page that is still
    /// loading when the budget runs out is snapshotted as-is — partial
    /// content flows downstream, where the extraction cascades tolerate it.
    /// `ready_selector`, when given, is polled so a dynamic page gets a
    /// chance to populate before the snapshot is taken.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Navigation`] when the navigation itself fails (bad
    /// host, connection refused); [`ScraperError::Script`] when the DOM
    /// cannot be serialized at all.
    pub async fn render(
        &self,
        url: &str,
        ready_selector: Option<&str>,
        timeout: Duration,
    ) -> Result<RenderedPage, ScraperError> {
        let deadline = Instant::now() + timeout;
        let page = self.browser.new_page("about:blank").await?;
        let outcome = Self::navigate_and_snapshot(&page, url, ready_selector, deadline).await;
        let _ = page.close().await;
        outcome
    }

    /// Drives the site's own search form: loads `base_url`, fills the query
    /// input via script, submits, waits, snapshots.
    ///
    /// Returns `Ok(None)` when the page has no recognizable search input.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::render`].
    pub async fn render_search_form(
        &self,
        base_url: &str,
        query: &str,
        results_selector: &str,
        timeout: Duration,
    ) -> Result<Option<RenderedPage>, ScraperError> {
        let deadline = Instant::now() + timeout;
        let page = self.browser.new_page("about:blank").await?;
        let outcome =
            Self::submit_and_snapshot(&page, base_url, query, results_selector, deadline).await;
        let _ = page.close().await;
        outcome
    }

    async fn navigate_and_snapshot(
        page: &Page,
        url: &str,
        ready_selector: Option<&str>,
        deadline: Instant,
    ) -> Result<RenderedPage, ScraperError> {
        Self::navigate(page, url, deadline).await?;
        if let Some(selector) = ready_selector {
            Self::wait_for_selector(page, selector, deadline).await;
        }
        Self::snapshot(page).await
    }

    async fn submit_and_snapshot(
        page: &Page,
        base_url: &str,
        query: &str,
        results_selector: &str,
        deadline: Instant,
    ) -> Result<Option<RenderedPage>, ScraperError> {
        Self::navigate(page, base_url, deadline).await?;
        Self::wait_for_selector(page, "input[name='query']", deadline).await;

        // {query:?} produces a quoted, escaped literal that is valid JS.
        let script = format!(
            r#"(() => {{
                const input = document.querySelector("input[name='query']")
                    || document.querySelector("input[type='search']");
                if (!input) return false;
                input.value = {query:?};
                if (input.form) {{
                    input.form.submit();
                }} else {{
                    input.dispatchEvent(new KeyboardEvent('keydown', {{ key: 'Enter', bubbles: true }}));
                }}
                return true;
            }})()"#
        );
        let submitted = page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| ScraperError::Script {
                reason: e.to_string(),
            })?;
        if !submitted {
            tracing::debug!(base_url, "no search input on page; cannot resubmit query");
            return Ok(None);
        }

        // The submit triggers a navigation; give it the remaining budget but
        // tolerate it never settling.
        let _ = tokio::time::timeout_at(deadline, page.wait_for_navigation()).await;
        Self::wait_for_selector(page, results_selector, deadline).await;
        Self::snapshot(page).await.map(Some)
    }

    async fn navigate(page: &Page, url: &str, deadline: Instant) -> Result<(), ScraperError> {
        match tokio::time::timeout_at(deadline, page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout_at(deadline, page.wait_for_navigation()).await;
                Ok(())
            }
            Ok(Err(e)) => Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!(url, "page load timed out; proceeding with partial content");
                Ok(())
            }
        }
    }

    /// Polls for `selector` until it appears or the deadline passes. A miss
    /// is not an error — the caller snapshots whatever rendered.
    async fn wait_for_selector(page: &Page, selector: &str, deadline: Instant) {
        let script = format!("document.querySelector({selector:?}) !== null");
        loop {
            let present = page
                .evaluate(script.clone())
                .await
                .ok()
                .and_then(|result| result.into_value::<bool>().ok())
                .unwrap_or(false);
            if present {
                return;
            }
            if Instant::now() + READY_POLL_INTERVAL >= deadline {
                tracing::debug!(selector, "ready selector never appeared before deadline");
                return;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn snapshot(page: &Page) -> Result<RenderedPage, ScraperError> {
        let html = page
            .evaluate("document.documentElement.outerHTML")
            .await?
            .into_value::<String>()
            .map_err(|e| ScraperError::Script {
                reason: e.to_string(),
            })?;
        let text = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await?
            .into_value::<String>()
            .map_err(|e| ScraperError::Script {
                reason: e.to_string(),
            })?;
        Ok(RenderedPage::new(html, text))
    }

    /// Tears the browser process down. Called on every exit path by the
    /// fetcher so no Chrome process outlives its request.
    pub async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            tracing::debug!(%error, "browser close failed; process will be reaped on drop");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_chrome_prefers_existing_configured_path() {
        // /bin/sh exists everywhere we run tests; the point is only that an
        // existing configured path short-circuits discovery.
        let configured = PathBuf::from("/bin/sh");
        assert_eq!(find_chrome(Some(&configured)), Some(configured));
    }

    #[test]
    fn find_chrome_ignores_missing_configured_path() {
        let configured = PathBuf::from("/definitely/not/a/browser");
        // Falls through to discovery; may or may not find a real Chrome, but
        // must not return the bogus path.
        assert_ne!(find_chrome(Some(&configured)), Some(configured));
    }

    #[tokio::test]
    #[ignore] // Requires a Chrome/Chromium install.
    async fn renders_a_static_page() {
        let session = BrowserSession::launch(None).await.expect("launch");
        let page = session
            .render(
                "data:text/html,<h1>High Street Pharmacy</h1>",
                Some("h1"),
                Duration::from_secs(10),
            )
            .await
            .expect("render");
        session.close().await;

        assert!(page.html.contains("<h1>High Street Pharmacy</h1>"));
        assert!(page.text.contains("High Street Pharmacy"));
    }
}
