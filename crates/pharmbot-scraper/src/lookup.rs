//! Lookup orchestration: one end-to-end pharmacy query.
//!
//! Sequences search-page fetch → identifier cascade → bounded-fan-out
//! detail fetches → record collection. The whole sequence runs under one
//! deadline; when it expires, in-flight fetches are abandoned and whatever
//! completed is returned.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use pharmbot_core::{is_valid_identifier, PharmacyRecord, QueryError, ScrapeConfig};
use tokio::time::Instant;

use crate::detail;
use crate::error::LookupError;
use crate::fetcher::PageSource;
use crate::search;

/// Headroom on top of the page-load budget for browser launch and teardown
/// within one detail fetch.
const DETAIL_OVERHEAD_SECS: u64 = 5;

/// Drives lookups against a [`PageSource`].
pub struct PharmacyLookup {
    source: Arc<dyn PageSource>,
    config: ScrapeConfig,
}

impl PharmacyLookup {
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>, config: ScrapeConfig) -> Self {
        Self { source, config }
    }

    /// Look up every pharmacy near a postcode.
    ///
    /// `Ok(vec![])` is a legitimate "nothing found" outcome. Partial results
    /// are returned when the lookup budget expires mid-collection.
    ///
    /// # Errors
    ///
    /// [`LookupError::Query`] when `text` is not a UK postcode (reported
    /// before any network work); [`LookupError::Scrape`] when the search
    /// page itself cannot be fetched (browser unavailable, navigation
    /// failure).
    pub async fn lookup_by_postcode(
        &self,
        text: &str,
    ) -> Result<Vec<PharmacyRecord>, LookupError> {
        let postcode =
            pharmbot_core::normalize_postcode(text).ok_or_else(|| QueryError::Invalid {
                input: text.trim().to_owned(),
            })?;

        let deadline = Instant::now() + Duration::from_secs(self.config.lookup_budget_secs);
        let identifiers = self.search_identifiers(&postcode, deadline).await?;
        if identifiers.is_empty() {
            tracing::info!(postcode = %postcode, "no pharmacies found");
            return Ok(Vec::new());
        }

        tracing::info!(
            postcode = %postcode,
            count = identifiers.len(),
            "pharmacies found; fetching details"
        );
        let records = self.collect_details(&identifiers, deadline).await;
        Ok(self.order_for_presentation(records))
    }

    /// Look up one pharmacy by its code, skipping the search step.
    ///
    /// `Ok(None)` means the source site does not know the code.
    ///
    /// # Errors
    ///
    /// [`LookupError::Query`] when `code` is not identifier-shaped;
    /// [`LookupError::Scrape`] when the detail page cannot be fetched.
    pub async fn lookup_by_code(
        &self,
        code: &str,
    ) -> Result<Option<PharmacyRecord>, LookupError> {
        let upper = code.trim().to_uppercase();
        if !is_valid_identifier(&upper) {
            return Err(QueryError::Invalid {
                input: code.trim().to_owned(),
            }
            .into());
        }

        let budget = Duration::from_secs(self.config.lookup_budget_secs);
        match tokio::time::timeout(budget, self.direct_detail(&upper)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(identifier = %upper, "direct lookup exceeded budget");
                Ok(None)
            }
        }
    }

    async fn direct_detail(&self, identifier: &str) -> Result<Option<PharmacyRecord>, LookupError> {
        let page = self.source.detail_page(identifier).await?;
        Ok(detail::extract_record(&page, identifier))
    }

    /// Runs the identifier cascade, falling back to driving the site's own
    /// search form when the direct search page yields nothing.
    async fn search_identifiers(
        &self,
        postcode: &str,
        deadline: Instant,
    ) -> Result<Vec<String>, LookupError> {
        let page = self.source.search_page(postcode).await?;
        let identifiers = search::extract_identifiers(&page, self.config.max_results);
        if !identifiers.is_empty() {
            return Ok(identifiers);
        }

        if Instant::now() >= deadline {
            return Ok(Vec::new());
        }
        match self.source.search_page_via_form(postcode).await {
            Ok(Some(page)) => Ok(search::extract_identifiers(&page, self.config.max_results)),
            Ok(None) => Ok(Vec::new()),
            Err(error) => {
                // The direct search already succeeded with zero hits; a broken
                // fallback must not turn that into a request failure.
                tracing::warn!(%error, "form-driven search fallback failed");
                Ok(Vec::new())
            }
        }
    }

    /// Fetches detail pages with bounded fan-out, collecting records as they
    /// complete until done or the deadline passes. Each item carries its
    /// discovery index so completion order can be undone afterwards.
    async fn collect_details(
        &self,
        identifiers: &[String],
        deadline: Instant,
    ) -> Vec<(usize, PharmacyRecord)> {
        let concurrency = self.config.max_concurrent_details.max(1);
        let sequential = concurrency == 1;
        let courtesy_delay = Duration::from_millis(self.config.inter_fetch_delay_ms);
        let per_detail = Duration::from_secs(
            self.config
                .page_timeout_secs
                .saturating_add(DETAIL_OVERHEAD_SECS),
        );

        let mut details = stream::iter(identifiers.iter().cloned().enumerate())
            .map(|(index, identifier)| async move {
                if sequential && index > 0 && courtesy_delay > Duration::ZERO {
                    tokio::time::sleep(courtesy_delay).await;
                }
                match tokio::time::timeout(per_detail, self.fetch_detail(&identifier)).await {
                    Ok(Some(record)) => Some((index, record)),
                    Ok(None) => None,
                    Err(_) => {
                        tracing::warn!(identifier = %identifier, "detail fetch timed out");
                        None
                    }
                }
            })
            .buffer_unordered(concurrency);

        let mut records = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, details.next()).await {
                Ok(Some(Some(record))) => records.push(record),
                Ok(Some(None)) => {}
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        collected = records.len(),
                        total = identifiers.len(),
                        "lookup budget exhausted; returning partial results"
                    );
                    break;
                }
            }
        }
        records
    }

    /// One isolated detail fetch: any failure is logged and becomes "no
    /// record" rather than aborting the sibling fetches.
    async fn fetch_detail(&self, identifier: &str) -> Option<PharmacyRecord> {
        match self.source.detail_page(identifier).await {
            Ok(page) => detail::extract_record(&page, identifier),
            Err(error) => {
                tracing::warn!(identifier, %error, "detail fetch failed; skipping");
                None
            }
        }
    }

    /// Presentation order: stable discovery order, with the configured
    /// priority chain (if any) sorted to the front.
    fn order_for_presentation(
        &self,
        mut records: Vec<(usize, PharmacyRecord)>,
    ) -> Vec<PharmacyRecord> {
        if let Some(chain) = &self.config.priority_chain {
            let chain = chain.to_lowercase();
            records.sort_by_key(|(index, record)| {
                (!record.name.to_lowercase().starts_with(&chain), *index)
            });
        } else {
            records.sort_by_key(|(index, _)| *index);
        }
        records.into_iter().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
#[path = "lookup_test.rs"]
mod tests;
