//! Committee-update extraction.
//!
//! Most committee sections are not newsworthy; a candidate is only emitted
//! when the section mentions an inquiry or a call for submissions.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use parlwatch_shared::{Document, DocumentType};

use super::{class_matches, text_of};

/// Container nodes that look like committee sections.
static COMMITTEE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)committee").expect("committee class regex"));

/// Newsworthiness gate: inquiry or submission activity.
static INQUIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)inquiry|submission").expect("inquiry regex"));

pub(crate) fn extract(doc: &Html, source_url: &str) -> Vec<Document> {
    let container_sel = Selector::parse("div, section").unwrap();
    let heading_sel = Selector::parse("h2, h3, h4").unwrap();

    let mut documents = Vec::new();

    for node in doc.select(&container_sel) {
        if !class_matches(&node, &COMMITTEE_CLASS_RE) {
            continue;
        }

        let Some(name_el) = node.select(&heading_sel).next() else {
            debug!(source_url, "committee node without a heading, skipping");
            continue;
        };

        let name = text_of(&name_el);
        if name.is_empty() {
            continue;
        }

        let Some(inquiry) = node
            .text()
            .map(str::trim)
            .find(|t| INQUIRY_RE.is_match(t))
            .map(String::from)
        else {
            // No inquiry or submission activity: not newsworthy.
            continue;
        };

        let mut document = Document::new(
            source_url,
            format!("Committee Update: {name}"),
            DocumentType::CommitteeReport,
        );
        document.description = Some(inquiry);
        document.committee = Some(name);
        documents.push(document);
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_only_committees_with_inquiry_activity() {
        let html = r#"<html><body>
            <section class="committee-panel">
                <h3>Public Accounts Committee</h3>
                <p>Inquiry into budget estimates — submissions close 30 September.</p>
            </section>
            <section class="committee-panel">
                <h3>Standing Orders Committee</h3>
                <p>Meets on the first Tuesday of each sitting month.</p>
            </section>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let updates = extract(&doc, "https://example.org/committees");

        assert_eq!(updates.len(), 1);
        let update = &updates[0];
        assert_eq!(update.title, "Committee Update: Public Accounts Committee");
        assert_eq!(update.committee.as_deref(), Some("Public Accounts Committee"));
        assert!(update.description.as_deref().unwrap().contains("Inquiry"));
        assert_eq!(update.document_type, DocumentType::CommitteeReport);
    }

    #[test]
    fn headingless_sections_are_skipped() {
        let html = r#"<html><body>
            <div class="committee-list">Current inquiry submissions are listed below.</div>
        </body></html>"#;

        let doc = Html::parse_document(html);
        let updates = extract(&doc, "https://example.org/committees");
        assert!(updates.is_empty());
    }
}
