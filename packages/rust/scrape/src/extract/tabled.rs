//! Tabled-papers extraction.
//!
//! Paper listings vary between chambers and across session years; the
//! selectors key off class *semantics* (`paper`, `document`, `tabled`)
//! rather than a fixed page layout.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use parlwatch_shared::{Document, DocumentType};

use super::{absolutize, class_matches, text_of};

/// Container nodes that look like paper listings.
static PAPER_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(paper|document|tabled)").expect("paper class regex"));

/// Title-ish link or span within a listing node.
static TITLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title").expect("title class regex"));

/// Free-text date token: `D[D] Month YYYY`.
static DATE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\s+\w+\s+\d{4}").expect("date token regex"));

pub(crate) fn extract(
    doc: &Html,
    source_url: &str,
    chamber: Option<&str>,
    site_root: &Url,
) -> Vec<Document> {
    let container_sel = Selector::parse("tr, div, li").unwrap();
    let title_sel = Selector::parse("a, span").unwrap();
    let anchor_sel = Selector::parse("a").unwrap();

    let mut documents = Vec::new();

    for node in doc.select(&container_sel) {
        if !class_matches(&node, &PAPER_CLASS_RE) {
            continue;
        }

        // Prefer an explicitly title-classed link/span, fall back to the
        // first link at all.
        let title_el = node
            .select(&title_sel)
            .find(|el| class_matches(el, &TITLE_CLASS_RE))
            .or_else(|| node.select(&anchor_sel).next());

        let Some(title_el) = title_el else {
            debug!(source_url, "paper node without a link, skipping");
            continue;
        };

        let title = text_of(&title_el);
        if title.is_empty() {
            debug!(source_url, "paper node with empty title, skipping");
            continue;
        }

        let document_url = if title_el.value().name() == "a" {
            title_el
                .value()
                .attr("href")
                .and_then(|href| absolutize(href, site_root))
        } else {
            None
        };

        // Best-effort date: first token that looks like `14 March 2025`.
        // Unparseable tokens leave the date unset.
        let date_published = node
            .text()
            .find_map(|t| DATE_TOKEN_RE.find(t))
            .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%d %B %Y").ok());

        let mut document = Document::new(source_url, title, DocumentType::TabledPaper);
        document.document_url = document_url;
        document.chamber = chamber.map(Into::into);
        document.date_published = date_published;
        documents.push(document);
    }

    documents
}
