//! Page acquisition behind the [`PageSource`] seam.
//!
//! The orchestrator only ever talks to this trait, so the lookup pipeline is
//! testable against canned snapshots while production runs one throwaway
//! browser session per fetch.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pharmbot_core::ScrapeConfig;

use crate::browser::BrowserSession;
use crate::error::ScraperError;
use crate::types::RenderedPage;

/// Marks a search page as populated.
pub(crate) const SEARCH_READY_SELECTOR: &str = "tr.search-result";
/// Marks a detail page as populated.
pub(crate) const DETAIL_READY_SELECTOR: &str = ".list-group-item-text";

/// Supplies rendered pages to the lookup orchestrator.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// The search-results page for a normalized postcode query.
    async fn search_page(&self, query: &str) -> Result<RenderedPage, ScraperError>;

    /// Last-resort search: drive the site's own search form with `query`.
    /// `Ok(None)` means the page exposes no search input.
    async fn search_page_via_form(
        &self,
        query: &str,
    ) -> Result<Option<RenderedPage>, ScraperError>;

    /// The detail page for one pharmacy identifier.
    async fn detail_page(&self, identifier: &str) -> Result<RenderedPage, ScraperError>;
}

/// Production [`PageSource`]: one exclusive headless Chrome session per
/// fetch, torn down on every exit path.
pub struct ChromeFetcher {
    config: ScrapeConfig,
    chrome_binary: Option<PathBuf>,
}

impl ChromeFetcher {
    #[must_use]
    pub fn new(config: ScrapeConfig, chrome_binary: Option<PathBuf>) -> Self {
        Self {
            config,
            chrome_binary,
        }
    }

    fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.config.page_timeout_secs)
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search.php?query={}",
            self.config.base_url,
            utf8_percent_encode(query, NON_ALPHANUMERIC)
        )
    }

    fn detail_url(&self, identifier: &str) -> String {
        format!(
            "{}/nacs_select.php?query={}",
            self.config.base_url,
            utf8_percent_encode(identifier, NON_ALPHANUMERIC)
        )
    }

    async fn fetch(&self, url: &str, ready: &str) -> Result<RenderedPage, ScraperError> {
        let session = BrowserSession::launch(self.chrome_binary.as_deref()).await?;
        let outcome = session.render(url, Some(ready), self.page_timeout()).await;
        session.close().await;
        outcome
    }
}

#[async_trait]
impl PageSource for ChromeFetcher {
    async fn search_page(&self, query: &str) -> Result<RenderedPage, ScraperError> {
        self.fetch(&self.search_url(query), SEARCH_READY_SELECTOR)
            .await
    }

    async fn search_page_via_form(
        &self,
        query: &str,
    ) -> Result<Option<RenderedPage>, ScraperError> {
        let session = BrowserSession::launch(self.chrome_binary.as_deref()).await?;
        let outcome = session
            .render_search_form(
                &self.config.base_url,
                query,
                SEARCH_READY_SELECTOR,
                self.page_timeout(),
            )
            .await;
        session.close().await;
        outcome
    }

    async fn detail_page(&self, identifier: &str) -> Result<RenderedPage, ScraperError> {
        self.fetch(&self.detail_url(identifier), DETAIL_READY_SELECTOR)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> ChromeFetcher {
        ChromeFetcher::new(
            ScrapeConfig {
                base_url: "https://www.pharmdata.co.uk".to_string(),
                page_timeout_secs: 15,
                lookup_budget_secs: 45,
                max_concurrent_details: 3,
                max_results: 5,
                inter_fetch_delay_ms: 500,
                priority_chain: None,
            },
            None,
        )
    }

    #[test]
    fn search_url_percent_encodes_the_query() {
        assert_eq!(
            fetcher().search_url("SW1A 1AA"),
            "https://www.pharmdata.co.uk/search.php?query=SW1A%201AA"
        );
    }

    #[test]
    fn detail_url_embeds_the_identifier() {
        assert_eq!(
            fetcher().detail_url("FJ144"),
            "https://www.pharmdata.co.uk/nacs_select.php?query=FJ144"
        );
    }
}
