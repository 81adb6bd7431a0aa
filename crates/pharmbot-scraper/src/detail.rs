//! Per-field extraction from rendered pharmacy detail pages.
//!
//! Every field has its own strategy cascade and its own neutral default, so
//! one missing figure never takes down the rest of the record. The page
//! itself is only rejected (`None`) when it carries an explicit negative
//! marker — "found but metrics missing" and "not found" are different
//! outcomes.

use pharmbot_core::{find_postcode, PharmacyRecord, ServiceMetrics};
use regex::Regex;
use scraper::{Html, Selector};

use crate::types::RenderedPage;

/// Phrases that mark a detail page as "no such pharmacy".
const NEGATIVE_MARKERS: [&str; 2] = ["not found", "no results"];

/// Maximum byte gap between a metric label and its value in visible text.
/// Covers rendered layouts like `"Items Dispensed\n12,345 (ranked 210th)"`.
const METRIC_LABEL_WINDOW: usize = 60;

/// Extract a [`PharmacyRecord`] from a rendered detail page.
///
/// Returns `None` only when the page explicitly reports that the pharmacy
/// does not exist. A page with no recognizable structure still yields a
/// record: a text-only pass recovers name and postcode and defaults every
/// metric.
#[must_use]
pub fn extract_record(page: &RenderedPage, identifier: &str) -> Option<PharmacyRecord> {
    let text_lower = page.text.to_lowercase();
    if NEGATIVE_MARKERS
        .iter()
        .any(|marker| text_lower.contains(marker))
    {
        tracing::debug!(identifier, "detail page reports no such pharmacy");
        return None;
    }

    let document = Html::parse_document(&page.html);
    if !has_recognizable_structure(&document) {
        tracing::warn!(
            identifier,
            "detail page has no recognizable structure; text-only fallback"
        );
        return Some(text_only_record(page, identifier));
    }

    let name = strip_code_suffix(&extract_name(&document, &page.text, identifier));
    let postcode = address_block_text(&document)
        .as_deref()
        .and_then(find_postcode)
        .or_else(|| find_postcode(&page.text))
        .unwrap_or_else(|| "N/A".to_string());
    let address = extract_address(&page.text, &name);
    let metrics = extract_metrics(&document, &page.text);

    Some(PharmacyRecord {
        identifier: identifier.to_string(),
        name,
        address,
        postcode,
        metrics,
    })
}

/// Secondary tier: derive what we can from raw visible text alone.
fn text_only_record(page: &RenderedPage, identifier: &str) -> PharmacyRecord {
    let name = strip_code_suffix(
        &name_from_text(&page.text).unwrap_or_else(|| format!("Pharmacy {identifier}")),
    );
    let address = extract_address(&page.text, &name);
    PharmacyRecord {
        identifier: identifier.to_string(),
        name,
        address,
        postcode: find_postcode(&page.text).unwrap_or_else(|| "N/A".to_string()),
        metrics: ServiceMetrics::default(),
    }
}

/// A page qualifies for the structured pass when any of the selectors the
/// cascades rely on is present at all.
fn has_recognizable_structure(document: &Html) -> bool {
    let selector = Selector::parse(
        ".list-group-item-text, .panel-title-custom, .panel-title, h1, h2, h3, h4, div.col-md-3",
    )
    .expect("valid selector");
    document.select(&selector).next().is_some()
}

// ---------------------------------------------------------------------------
// Name
// ---------------------------------------------------------------------------

/// Name cascade: semantic headings, then the site's known title classes,
/// then text patterns, then a synthetic `Pharmacy <id>` placeholder.
fn extract_name(document: &Html, text: &str, identifier: &str) -> String {
    name_from_headings(document)
        .or_else(|| name_from_classes(document))
        .or_else(|| name_from_text(text))
        .unwrap_or_else(|| format!("Pharmacy {identifier}"))
}

fn name_from_headings(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1, h2, h3, h4").expect("valid selector");
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|heading| heading.to_lowercase().contains("pharmacy"))
}

fn name_from_classes(document: &Html) -> Option<String> {
    let selector =
        Selector::parse(".panel-title-custom, .panel-title, .pharmacy-name").expect("valid selector");
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|title| !title.is_empty())
}

fn name_from_text(text: &str) -> Option<String> {
    // Known chains first (optionally with a trailing "Pharmacy"), then the
    // generic "<Capitalized words> Pharmacy" shape.
    let chains = Regex::new(
        r"\b((?:Boots|LloydsPharmacy|Lloyds|Well|Rowlands|Day Lewis|Superdrug|Paydens|Kamsons|Jhoots|Asda|Tesco)(?:\s+Pharmacy)?)\b",
    )
    .expect("valid regex");
    if let Some(captures) = chains.captures(text) {
        return Some(captures[1].to_string());
    }

    let generic = Regex::new(r"\b([A-Z][A-Za-z'&.-]*(?:\s+[A-Z][A-Za-z'&.-]*){0,4}\s+Pharmacy)\b")
        .expect("valid regex");
    generic.captures(text).map(|captures| captures[1].to_string())
}

/// Drops a trailing parenthetical code suffix: `"Day Lewis Pharmacy (FJ144)"`
/// becomes `"Day Lewis Pharmacy"`.
fn strip_code_suffix(name: &str) -> String {
    name.split('(').next().unwrap_or(name).trim().to_string()
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

fn address_block_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("div.col-md-3, address, .address").expect("valid selector");
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|block| !block.trim().is_empty())
}

/// Address cascade: an explicit `Address:` label wins; otherwise the first
/// comma-separated span on the lines right after the pharmacy name.
fn extract_address(text: &str, name: &str) -> Option<String> {
    let labeled = Regex::new(r"(?im)^\s*Address:\s*(.+)$").expect("valid regex");
    if let Some(captures) = labeled.captures(text) {
        return Some(captures[1].trim().to_string());
    }

    let after_name = text.find(name).map(|pos| &text[pos + name.len()..])?;
    after_name
        .lines()
        .take(4)
        .map(|line| line.trim_matches([',', ' ', '\t']))
        .find(|line| line.contains(',') && line.len() > 8)
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Metric extraction: a positional pass over the page's `.list-group-item-text`
/// blocks (six figures in fixed source order), with an independent per-field
/// label regex as fallback. Each field defaults on its own.
fn extract_metrics(document: &Html, text: &str) -> ServiceMetrics {
    let defaults = ServiceMetrics::default();
    let blocks = metric_blocks(document);
    let positional = |idx: usize| {
        blocks
            .as_ref()
            .and_then(|values| first_token(&values[idx]))
    };

    ServiceMetrics {
        items: positional(0)
            .or_else(|| metric_from_text(text, &["Items Dispensed", "Items"]))
            .unwrap_or(defaults.items),
        forms: positional(1)
            .or_else(|| metric_from_text(text, &["Prescription Forms", "Prescriptions", "Forms"]))
            .unwrap_or(defaults.forms),
        cpcs: positional(2)
            .or_else(|| metric_from_text(text, &["CPCS"]))
            .unwrap_or(defaults.cpcs),
        pharmacy_first: positional(3)
            .or_else(|| metric_from_text(text, &["Pharmacy First"]))
            .unwrap_or(defaults.pharmacy_first),
        nms: positional(4)
            .or_else(|| metric_from_text(text, &["New Medicine Service", "NMS"]))
            .unwrap_or(defaults.nms),
        eps_takeup: blocks
            .as_ref()
            .and_then(|values| percentage_prefix(&values[5]))
            .or_else(|| percent_from_text(text, &["EPS Takeup", "EPS"]))
            .unwrap_or(defaults.eps_takeup),
    }
}

/// The six metric blocks in source order, or `None` when the page does not
/// carry the full set.
fn metric_blocks(document: &Html) -> Option<Vec<String>> {
    let selector = Selector::parse(".list-group-item-text").expect("valid selector");
    let blocks: Vec<String> = document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .collect();
    (blocks.len() >= 6).then_some(blocks)
}

fn first_token(block: &str) -> Option<String> {
    block.split_whitespace().next().map(str::to_string)
}

/// `"98.5% of prescriptions"` → `"98.5%"`. `None` when the block carries no
/// percent sign, so the label-regex fallback gets its turn.
fn percentage_prefix(block: &str) -> Option<String> {
    block
        .contains('%')
        .then(|| format!("{}%", block.split('%').next().unwrap_or("").trim()))
}

/// Label-keyed fallback: the first number (with optional thousands commas
/// and decimals) within the window after any of the label synonyms. An
/// adjacent parenthetical rank is tolerated but not kept.
fn metric_from_text(text: &str, labels: &[&str]) -> Option<String> {
    for label in labels {
        let pattern = format!(
            r"(?i)\b{}\b[^0-9]{{0,{METRIC_LABEL_WINDOW}}}([0-9][0-9,]*(?:\.[0-9]+)?)(?:\s*\([^)]*\))?",
            regex::escape(label)
        );
        let re = Regex::new(&pattern).expect("valid regex");
        if let Some(captures) = re.captures(text) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Like [`metric_from_text`] but requires a trailing percent sign, which is
/// re-attached to the captured value.
fn percent_from_text(text: &str, labels: &[&str]) -> Option<String> {
    for label in labels {
        let pattern = format!(
            r"(?i)\b{}\b[^0-9%]{{0,{METRIC_LABEL_WINDOW}}}([0-9][0-9,]*(?:\.[0-9]+)?)\s*%",
            regex::escape(label)
        );
        let re = Regex::new(&pattern).expect("valid regex");
        if let Some(captures) = re.captures(text) {
            return Some(format!("{}%", &captures[1]));
        }
    }
    None
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "detail_test.rs"]
mod tests;
