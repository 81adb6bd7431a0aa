//! Rendering lookup outcomes into chat messages.

use pharmbot_core::{PharmacyRecord, SearchQuery};

pub fn searching_message(query: &SearchQuery) -> String {
    match query {
        SearchQuery::Postcode(postcode) => format!("Searching for pharmacies near {postcode}… 🔍"),
        SearchQuery::Code(code) => format!("Looking up pharmacy {code}… 🔍"),
    }
}

/// One message block for the whole result set.
pub fn format_records(records: &[PharmacyRecord]) -> String {
    let mut out = String::from("📊 Results (3-Month Averages) 📊\n");
    for record in records {
        out.push_str(&format!(
            "\n🏥 Pharmacy: {} ({})\n",
            record.name, record.postcode
        ));
        if let Some(address) = &record.address {
            out.push_str(&format!("📍 Address: {address}\n"));
        }
        out.push_str(&format!("📦 Items Dispensed: {}\n", record.metrics.items));
        out.push_str(&format!("📝 Prescriptions: {}\n", record.metrics.forms));
        out.push_str(&format!("🩺 CPCS: {}\n", record.metrics.cpcs));
        out.push_str(&format!(
            "💊 Pharmacy First: {}\n",
            record.metrics.pharmacy_first
        ));
        out.push_str(&format!("🔄 NMS: {}\n", record.metrics.nms));
        out.push_str(&format!("💻 EPS Takeup: {}\n", record.metrics.eps_takeup));
    }
    out
}

#[cfg(test)]
mod tests {
    use pharmbot_core::ServiceMetrics;

    use super::*;

    fn record(name: &str, postcode: &str) -> PharmacyRecord {
        PharmacyRecord {
            identifier: "FJ144".to_string(),
            name: name.to_string(),
            address: None,
            postcode: postcode.to_string(),
            metrics: ServiceMetrics::default(),
        }
    }

    #[test]
    fn renders_one_block_per_record_under_a_single_header() {
        let records = vec![
            record("Day Lewis Pharmacy", "SW1A 2BC"),
            record("Boots Pharmacy", "SW1A 3CD"),
        ];
        let rendered = format_records(&records);

        assert!(rendered.starts_with("📊 Results (3-Month Averages) 📊\n"));
        assert_eq!(rendered.matches("🏥 Pharmacy:").count(), 2);
        assert!(rendered.contains("🏥 Pharmacy: Day Lewis Pharmacy (SW1A 2BC)"));
        assert!(rendered.contains("💻 EPS Takeup: 0%"));
    }

    #[test]
    fn address_line_appears_only_when_present() {
        let mut with_address = record("Boots Pharmacy", "SW1A 3CD");
        with_address.address = Some("1 The Parade, Oxford OX1 2JD".to_string());

        let rendered = format_records(&[with_address]);
        assert!(rendered.contains("📍 Address: 1 The Parade, Oxford OX1 2JD"));

        let rendered = format_records(&[record("Boots Pharmacy", "SW1A 3CD")]);
        assert!(!rendered.contains("📍"));
    }

    #[test]
    fn searching_message_names_the_query() {
        let postcode = SearchQuery::Postcode("SW1A 1AA".to_string());
        assert!(searching_message(&postcode).contains("SW1A 1AA"));

        let code = SearchQuery::Code("FJ144".to_string());
        assert!(searching_message(&code).contains("FJ144"));
    }
}
