use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("no usable Chrome/Chromium binary: {reason}")]
    BrowserUnavailable { reason: String },

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page script failed: {reason}")]
    Script { reason: String },
}

/// Errors surfaced by the lookup orchestrator to the chat layer.
///
/// Empty results are deliberately NOT an error — a postcode with no
/// pharmacies yields `Ok(vec![])`.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Query(#[from] pharmbot_core::QueryError),

    #[error(transparent)]
    Scrape(#[from] ScraperError),
}
