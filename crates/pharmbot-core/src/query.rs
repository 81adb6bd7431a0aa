//! Parsing and validation of user-supplied search queries.
//!
//! A query is either a UK postcode or a direct 5-character pharmacy code.
//! Both forms are normalized to uppercase with canonical spacing before any
//! network work happens, so the scraper only ever sees well-formed input.

use regex::Regex;
use thiserror::Error;

/// Identifier-shaped tokens that show up when pattern-scanning raw HTML but
/// are never real pharmacy codes.
const IDENTIFIER_DENYLIST: [&str; 3] = ["CLASS", "WIDTH", "HTTPS"];

/// A validated, normalized user query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Canonical UK postcode, e.g. `"SW1A 1AA"`.
    Postcode(String),
    /// Direct pharmacy code, e.g. `"FJ144"`.
    Code(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("\"{input}\" is not a valid UK postcode or pharmacy code")]
    Invalid { input: String },
}

impl SearchQuery {
    /// Parses free text into a [`SearchQuery`].
    ///
    /// A 5-character identifier-shaped token (that is not denylisted) wins
    /// over postcode interpretation, so users can paste a code straight from
    /// a previous result and skip the search step.
    ///
    /// # Errors
    ///
    /// [`QueryError::Empty`] for blank input, [`QueryError::Invalid`] when
    /// the text matches neither shape.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }

        let upper = trimmed.to_uppercase();
        if is_valid_identifier(&upper) {
            return Ok(SearchQuery::Code(upper));
        }

        normalize_postcode(trimmed).map_or_else(
            || {
                Err(QueryError::Invalid {
                    input: trimmed.to_owned(),
                })
            },
            |postcode| Ok(SearchQuery::Postcode(postcode)),
        )
    }

    /// The normalized query string sent to the source site.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SearchQuery::Postcode(s) | SearchQuery::Code(s) => s,
        }
    }
}

/// Returns `true` when `token` has the pharmacy-identifier shape: exactly
/// 5 characters, a leading letter `A`–`Z`, four uppercase alphanumerics
/// after it, and is not one of the known HTML false positives.
///
/// The check is case-sensitive on purpose — identifiers are scanned out of
/// rendered markup without lowercasing, and `"fj144"` in page text is not a
/// code.
#[must_use]
pub fn is_valid_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    let leading_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());

    token.len() == 5
        && leading_letter
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && !IDENTIFIER_DENYLIST.contains(&token)
}

/// Normalizes a UK postcode into its canonical `"OUTWARD INWARD"` form.
///
/// Accepts arbitrary casing, spacing, and separator noise (`"sw1a1aa"`,
/// `"SW1A 1AA"`, `"sw1a-1aa"` all yield `"SW1A 1AA"`). Returns `None` when
/// the compacted input does not match the postcode shape.
#[must_use]
pub fn normalize_postcode(input: &str) -> Option<String> {
    let compact: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_uppercase();

    let shape = Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]?[0-9][A-Z]{2}$").expect("valid regex");
    if !shape.is_match(&compact) {
        return None;
    }

    // The inward code is always the final 3 characters.
    let split = compact.len() - 3;
    Some(format!("{} {}", &compact[..split], &compact[split..]))
}

/// Finds the first UK-postcode-shaped token in a block of text and returns
/// it with the outward/inward gap collapsed to a single space.
///
/// Matching is case-sensitive (postcodes render uppercase on the source
/// site), so lowercase lookalikes in prose are skipped.
#[must_use]
pub fn find_postcode(text: &str) -> Option<String> {
    let scan =
        Regex::new(r"\b([A-Z]{1,2}[0-9][A-Z0-9]?)\s*([0-9][A-Z]{2})\b").expect("valid regex");
    let captures = scan.captures(text)?;
    Some(format!("{} {}", &captures[1], &captures[2]))
}
