//! Identifier extraction from rendered search pages.
//!
//! Tries extraction strategies in priority order (result rows, detail
//! links, blind pattern scan) and returns the first non-empty result.
//! Strategies are pure functions over the snapshot, so each is testable
//! against canned HTML without a browser.

use pharmbot_core::is_valid_identifier;
use regex::Regex;
use scraper::{Html, Selector};

use crate::types::RenderedPage;

/// Extract up to `cap` unique pharmacy identifiers from a search page.
///
/// First-successful-strategy policy: the yields of different strategies are
/// never merged, and identifiers keep the order in which the winning
/// strategy discovered them. An empty result is a legitimate "no matches"
/// outcome, not an error.
#[must_use]
pub fn extract_identifiers(page: &RenderedPage, cap: usize) -> Vec<String> {
    let strategies: [(&str, fn(&RenderedPage) -> Vec<String>); 3] = [
        ("result-rows", ids_from_result_rows),
        ("detail-links", ids_from_detail_links),
        ("pattern-scan", ids_from_pattern_scan),
    ];

    for (strategy, extract) in strategies {
        let mut found = extract(page);
        if !found.is_empty() {
            found.truncate(cap);
            tracing::debug!(strategy, count = found.len(), "extracted identifiers");
            return found;
        }
    }

    tracing::debug!("no identifiers found on search page");
    Vec::new()
}

/// Strategy 1: row/list elements of the results table. The site renders one
/// `tr.search-result` per pharmacy with the code as the row id; generic
/// `tr[id]` and list items cover markup drift.
fn ids_from_result_rows(page: &RenderedPage) -> Vec<String> {
    let document = Html::parse_document(&page.html);
    let selector =
        Selector::parse("tr.search-result, tr[id], li.search-result").expect("valid selector");

    let mut out = Vec::new();
    for row in document.select(&selector) {
        if let Some(id) = row.value().attr("id") {
            push_unique(&mut out, id);
        }
        scan_tokens(&row.text().collect::<String>(), &mut out);
    }
    out
}

/// Strategy 2: anchors pointing at the detail endpoint (identifier in the
/// `query` URL parameter) or carrying an identifier-shaped link text.
fn ids_from_detail_links(page: &RenderedPage) -> Vec<String> {
    let document = Html::parse_document(&page.html);
    let selector = Selector::parse("a[href]").expect("valid selector");
    let href_re = Regex::new(r"[?&]query=([A-Z][A-Z0-9]{4})\b").expect("valid regex");

    let mut out = Vec::new();
    for anchor in document.select(&selector) {
        if let Some(href) = anchor.value().attr("href") {
            if let Some(captures) = href_re.captures(href) {
                push_unique(&mut out, &captures[1]);
            }
        }
        scan_tokens(&anchor.text().collect::<String>(), &mut out);
    }
    out
}

/// Strategy 3: blind scan for every identifier-shaped substring — the raw
/// markup first, the visible text only when the markup yields nothing.
fn ids_from_pattern_scan(page: &RenderedPage) -> Vec<String> {
    let mut out = Vec::new();
    scan_tokens(&page.html, &mut out);
    if out.is_empty() {
        scan_tokens(&page.text, &mut out);
    }
    out
}

/// Scans `text` for identifier-shaped tokens, appending valid unseen ones
/// to `out`. Matching is case-sensitive: codes render uppercase, and
/// lowercasing would drown the scan in markup noise.
fn scan_tokens(text: &str, out: &mut Vec<String>) {
    let token_re = Regex::new(r"\b[A-Z][A-Z0-9]{4}\b").expect("valid regex");
    for token in token_re.find_iter(text) {
        push_unique(out, token.as_str());
    }
}

fn push_unique(out: &mut Vec<String>, token: &str) {
    if is_valid_identifier(token) && !out.iter().any(|seen| seen == token) {
        out.push(token.to_string());
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
