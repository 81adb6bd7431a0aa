//! Domain records exchanged between the scraper and the chat layer.

use serde::{Deserialize, Serialize};

/// The six performance figures scraped per pharmacy.
///
/// Values are kept as the display strings found on the page (`"12,345"`,
/// `"98.5%"`, possibly with a parenthetical rank stripped off), not parsed
/// numbers — the chat layer renders them verbatim. A figure that cannot be
/// located defaults to a neutral placeholder rather than failing the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    /// Items dispensed (3-month average).
    pub items: String,
    /// Prescription forms.
    pub forms: String,
    pub cpcs: String,
    pub pharmacy_first: String,
    pub nms: String,
    /// EPS takeup; always carries a trailing percent sign.
    pub eps_takeup: String,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self {
            items: "0".to_string(),
            forms: "0".to_string(),
            cpcs: "0".to_string(),
            pharmacy_first: "0".to_string(),
            nms: "0".to_string(),
            eps_takeup: "0%".to_string(),
        }
    }
}

/// One pharmacy's scraped snapshot.
///
/// Created per lookup, sent to the user, then discarded — never persisted.
/// The record is meaningful even when every metric defaulted: `name` and
/// `postcode` alone identify the pharmacy to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PharmacyRecord {
    /// The 5-character code identifying the pharmacy on the source site.
    pub identifier: String,
    pub name: String,
    /// Street address when one could be extracted.
    pub address: Option<String>,
    /// Extracted postcode, or `"N/A"` when none was found on the page.
    pub postcode: String,
    pub metrics: ServiceMetrics,
}
