//! Source-kind-specific document extractors.
//!
//! Extraction is best-effort and tolerant of partial failure: a node
//! without an extractable title is skipped silently, and a page that
//! yields nothing is an empty candidate list, never an error.

mod bills;
mod committees;
mod tabled;

use scraper::{ElementRef, Html};
use url::Url;

use parlwatch_shared::{Document, MonitorError, Result, SourceKind};

/// Turns raw page HTML into candidate documents according to the rules of
/// each source kind.
pub struct Extractor {
    site_root: Url,
}

impl Extractor {
    /// Create an extractor that absolutizes relative links against
    /// `site_root`.
    pub fn new(site_root: &str) -> Result<Self> {
        let site_root = Url::parse(site_root)
            .map_err(|e| MonitorError::config(format!("invalid site root {site_root}: {e}")))?;
        Ok(Self { site_root })
    }

    /// Extract candidate documents from a fetched page.
    ///
    /// `chamber` is only meaningful for tabled-paper sources.
    pub fn extract(
        &self,
        kind: SourceKind,
        html: &str,
        source_url: &str,
        chamber: Option<&str>,
    ) -> Vec<Document> {
        let doc = Html::parse_document(html);
        match kind {
            SourceKind::TabledPapers => {
                tabled::extract(&doc, source_url, chamber, &self.site_root)
            }
            SourceKind::Bills => bills::extract(&doc, source_url, &self.site_root),
            SourceKind::Committees => committees::extract(&doc, source_url),
        }
    }
}

/// Whether an element's `class` attribute matches the given pattern.
fn class_matches(el: &ElementRef, re: &regex::Regex) -> bool {
    el.value().attr("class").is_some_and(|c| re.is_match(c))
}

/// Concatenated, trimmed text content of an element.
fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Resolve a possibly-relative href against the parliament site root.
fn absolutize(href: &str, site_root: &Url) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    site_root.join(href).ok().map(|u| u.to_string())
}
