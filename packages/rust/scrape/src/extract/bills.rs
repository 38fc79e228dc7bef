//! Bills extraction.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use parlwatch_shared::{Document, DocumentType};

use super::{absolutize, class_matches, text_of};

/// Container nodes that look like bill listings.
static BILL_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bill").expect("bill class regex"));

/// Reading-stage or royal-assent phrase in surrounding text.
static STAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(first|second|third)\s+reading|royal\s+assent").expect("stage regex")
});

pub(crate) fn extract(doc: &Html, source_url: &str, site_root: &Url) -> Vec<Document> {
    let container_sel = Selector::parse("tr, div").unwrap();
    let anchor_sel = Selector::parse("a").unwrap();

    let mut documents = Vec::new();

    for node in doc.select(&container_sel) {
        if !class_matches(&node, &BILL_CLASS_RE) {
            continue;
        }

        let Some(title_el) = node.select(&anchor_sel).next() else {
            debug!(source_url, "bill node without a link, skipping");
            continue;
        };

        let title = text_of(&title_el);
        if title.is_empty() {
            debug!(source_url, "bill node with empty title, skipping");
            continue;
        }

        let document_url = title_el
            .value()
            .attr("href")
            .and_then(|href| absolutize(href, site_root));

        // The reading stage lives in sibling text, e.g. "Second Reading" or
        // "Royal Assent 12 June 2025".
        let description = node
            .text()
            .map(str::trim)
            .find(|t| STAGE_RE.is_match(t))
            .map(String::from);

        let mut document = Document::new(source_url, title, DocumentType::Bill);
        document.document_url = document_url;
        document.description = description;
        documents.push(document);
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_root() -> Url {
        Url::parse("https://www.parliament.tas.gov.au").unwrap()
    }

    #[test]
    fn extracts_title_link_and_stage() {
        let html = r#"<html><body><table>
            <tr class="bill-row">
                <td><a href="/bills/gaming-reform">Gaming Reform Bill 2025</a></td>
                <td>Second Reading</td>
            </tr>
            <tr class="bill-row">
                <td><a href="/bills/water-management">Water Management Amendment Bill</a></td>
                <td>Royal Assent 12 June 2025</td>
            </tr>
        </table></body></html>"#;

        let doc = Html::parse_document(html);
        let bills = extract(&doc, "https://example.org/bills", &site_root());

        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].title, "Gaming Reform Bill 2025");
        assert_eq!(
            bills[0].document_url.as_deref(),
            Some("https://www.parliament.tas.gov.au/bills/gaming-reform")
        );
        assert_eq!(bills[0].description.as_deref(), Some("Second Reading"));
        assert_eq!(bills[0].document_type, DocumentType::Bill);

        assert_eq!(
            bills[1].description.as_deref(),
            Some("Royal Assent 12 June 2025")
        );
    }

    #[test]
    fn missing_stage_leaves_description_unset() {
        let html = r#"<html><body>
            <div class="bill-entry"><a href="/bills/x">Some Bill</a></div>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let bills = extract(&doc, "https://example.org/bills", &site_root());
        assert_eq!(bills.len(), 1);
        assert!(bills[0].description.is_none());
    }

    #[test]
    fn linkless_nodes_are_skipped() {
        let html = r#"<html><body>
            <div class="bill-note">Bills lapsed at prorogation are not listed.</div>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let bills = extract(&doc, "https://example.org/bills", &site_root());
        assert!(bills.is_empty());
    }
}
