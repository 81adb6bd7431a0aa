use super::*;

fn page(html: &str) -> RenderedPage {
    RenderedPage::new(html, "")
}

#[test]
fn extracts_row_ids_in_document_order() {
    let page = page(
        r#"
        <table>
            <tr class="search-result" id="FJ144"><td>Day Lewis Pharmacy</td></tr>
            <tr class="search-result" id="FJL09"><td>Boots</td></tr>
        </table>
    "#,
    );
    assert_eq!(extract_identifiers(&page, 5), vec!["FJ144", "FJL09"]);
}

#[test]
fn extracts_tokens_embedded_in_row_text() {
    let page = page(
        r#"
        <table>
            <tr class="search-result"><td>FA512 — High Street Pharmacy</td></tr>
        </table>
    "#,
    );
    assert_eq!(extract_identifiers(&page, 5), vec!["FA512"]);
}

#[test]
fn falls_back_to_detail_links_when_no_rows_match() {
    let page = page(
        r#"
        <div>
            <a href="/nacs_select.php?query=FJ144">Day Lewis Pharmacy</a>
            <a href="/nacs_select.php?query=FJL09">Boots</a>
        </div>
    "#,
    );
    assert_eq!(extract_identifiers(&page, 5), vec!["FJ144", "FJL09"]);
}

#[test]
fn extracts_identifier_from_anchor_text() {
    let page = page(r#"<p><a href="/about">Pharmacy FW221 details</a></p>"#);
    assert_eq!(extract_identifiers(&page, 5), vec!["FW221"]);
}

#[test]
fn first_successful_strategy_wins_over_later_ones() {
    // Rows yield FJ144; the anchor-only XX999 must not be merged in.
    let page = page(
        r#"
        <table><tr class="search-result" id="FJ144"><td>Day Lewis</td></tr></table>
        <a href="/nacs_select.php?query=XX999">other</a>
    "#,
    );
    assert_eq!(extract_identifiers(&page, 5), vec!["FJ144"]);
}

#[test]
fn blind_scan_dedupes_and_preserves_first_seen_order() {
    let page = page("<div>FJ144 FJL09 FJ144 FA512</div>");
    assert_eq!(extract_identifiers(&page, 5), vec!["FJ144", "FJL09", "FA512"]);
}

#[test]
fn blind_scan_caps_at_requested_limit() {
    let page = page("<div>FA001 FA002 FA003 FA004 FA005 FA006 FA007</div>");
    assert_eq!(
        extract_identifiers(&page, 5),
        vec!["FA001", "FA002", "FA003", "FA004", "FA005"]
    );
}

#[test]
fn blind_scan_rejects_denylisted_and_misshapen_tokens() {
    // CLASS/WIDTH/HTTPS have the right shape but are HTML noise; lowercase
    // and overlong tokens must not match at all.
    let page = page("<div>CLASS WIDTH HTTPS fj144 FJ1445 FB777</div>");
    assert_eq!(extract_identifiers(&page, 5), vec!["FB777"]);
}

#[test]
fn blind_scan_prefers_markup_over_visible_text() {
    let page = RenderedPage::new("<div data-row='FJ144'></div>", "FZ999 somewhere in text");
    assert_eq!(extract_identifiers(&page, 5), vec!["FJ144"]);
}

#[test]
fn blind_scan_reads_visible_text_when_markup_is_bare() {
    let page = RenderedPage::new("<div>no codes here</div>", "Your pharmacy is FZ999.");
    assert_eq!(extract_identifiers(&page, 5), vec!["FZ999"]);
}

#[test]
fn empty_page_yields_empty_list() {
    let page = RenderedPage::default();
    assert!(extract_identifiers(&page, 5).is_empty());
}
