//! Snapshot types handed from the fetcher to the extraction passes.

/// A rendered page snapshot: the serialized DOM plus the visible text.
///
/// Extraction strategies are pure functions over this struct, so a snapshot
/// taken from a timed-out, partially-loaded page flows through the same code
/// path as a complete one.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// `document.documentElement.outerHTML` at snapshot time.
    pub html: String,
    /// `document.body.innerText` at snapshot time.
    pub text: String,
}

impl RenderedPage {
    #[must_use]
    pub fn new(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            text: text.into(),
        }
    }
}
