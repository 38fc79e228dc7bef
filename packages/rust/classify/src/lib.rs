//! Keyword classification and alert-tier assignment.
//!
//! The classifier scans a lowercased corpus built from title, description,
//! and body text. Matching is case-insensitive *substring* matching with no
//! tokenization or word-boundary checks ("tax" matches inside "taxonomy");
//! this over-matching is accepted behavior.
//!
//! Tier precedence is fixed and evaluated first-match-wins:
//! critical keyword → high-priority source → keyword count > 3 → any match.
//! Critical keyword presence always outranks keyword count, and keyword
//! count only ever elevates to [`AlertTier::High`].

pub mod pdf;

use tracing::{debug, instrument, warn};

use parlwatch_scrape::Fetcher;
use parlwatch_shared::{AlertTier, AppConfig, Document};

/// Scans documents against the configured keyword watchlist and assigns an
/// alert tier. Tier is a function of content at discovery time and is never
/// recomputed after initial classification.
pub struct Classifier {
    /// Flat keyword watchlist; scan order = this order.
    keywords: Vec<String>,
    critical_keywords: Vec<String>,
    high_priority_sources: Vec<String>,
}

impl Classifier {
    /// Build a classifier from a configuration snapshot.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            keywords: config.alert_keywords(),
            critical_keywords: config.alerts.critical_keywords.clone(),
            high_priority_sources: config.alerts.high_priority_sources.clone(),
        }
    }

    /// Classify a document in place: backfill body text from a linked PDF
    /// when possible, then scan for keywords and assign a tier.
    #[instrument(skip_all, fields(title = %doc.title))]
    pub async fn classify(&self, doc: &mut Document, fetcher: &Fetcher) {
        self.backfill_content(doc, fetcher).await;
        self.scan(doc);
    }

    /// One-time, best-effort body-text backfill for documents linking a PDF.
    /// Any failure leaves body text empty; classification proceeds on
    /// title/description alone.
    pub async fn backfill_content(&self, doc: &mut Document, fetcher: &Fetcher) {
        if doc.content_text.is_some() {
            return;
        }
        let Some(url) = doc.document_url.clone() else {
            return;
        };
        if !url.to_lowercase().ends_with(".pdf") {
            return;
        }

        match fetcher.fetch_pdf(&url).await {
            Ok(Some(bytes)) => match pdf::extract_text(&bytes) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(%url, chars = text.len(), "backfilled body text from PDF");
                    doc.content_text = Some(text);
                }
                Ok(_) => debug!(%url, "PDF contained no extractable text"),
                Err(e) => debug!(%url, error = %e, "PDF text extraction failed"),
            },
            Ok(None) => debug!(%url, "linked resource is not a PDF"),
            Err(e) => warn!(%url, error = %e, "PDF fetch failed"),
        }
    }

    /// Scan the corpus and fill `keywords_found` + `alert_level`.
    pub fn scan(&self, doc: &mut Document) {
        let corpus = format!(
            "{} {} {}",
            doc.title,
            doc.description.as_deref().unwrap_or_default(),
            doc.content_text.as_deref().unwrap_or_default(),
        )
        .to_lowercase();

        let keywords_found: Vec<String> = self
            .keywords
            .iter()
            .filter(|kw| corpus.contains(&kw.to_lowercase()))
            .cloned()
            .collect();

        let tier = if self
            .critical_keywords
            .iter()
            .any(|kw| corpus.contains(&kw.to_lowercase()))
        {
            AlertTier::Critical
        } else if self
            .high_priority_sources
            .iter()
            .any(|src| corpus.contains(&src.to_lowercase()))
            || keywords_found.len() > 3
        {
            AlertTier::High
        } else if !keywords_found.is_empty() {
            AlertTier::Standard
        } else {
            AlertTier::Info
        };

        doc.keywords_found = keywords_found;
        doc.alert_level = tier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlwatch_shared::{DocumentType, ScrapingConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier() -> Classifier {
        Classifier::new(&AppConfig::default())
    }

    fn bill(title: &str, description: Option<&str>) -> Document {
        let mut doc = Document::new("https://example.org/bills", title, DocumentType::Bill);
        doc.description = description.map(Into::into);
        doc
    }

    #[test]
    fn two_matches_tier_standard() {
        let mut doc = bill(
            "Gaming Reform Bill",
            Some("amends the casino licence framework"),
        );
        classifier().scan(&mut doc);

        // Watchlist scan order is the sorted keyword union.
        assert_eq!(doc.keywords_found, vec!["casino", "gaming"]);
        assert_eq!(doc.alert_level, AlertTier::Standard);
    }

    #[test]
    fn critical_keyword_outranks_everything() {
        let mut doc = bill(
            "Gaming Reform Bill",
            Some("urgent casino measures for health, budget, tourism and infrastructure"),
        );
        classifier().scan(&mut doc);

        // 4+ keywords and a critical keyword: critical wins.
        assert!(doc.keywords_found.len() > 3);
        assert_eq!(doc.alert_level, AlertTier::Critical);
    }

    #[test]
    fn four_matches_without_critical_tier_high() {
        let mut doc = bill(
            "Omnibus Bill",
            Some("covers health, budget, tourism and infrastructure"),
        );
        classifier().scan(&mut doc);

        assert!(doc.keywords_found.len() > 3);
        assert_eq!(doc.alert_level, AlertTier::High);
    }

    #[test]
    fn high_priority_source_tier_high() {
        let mut doc = bill(
            "Statement of Expenditure",
            Some("tabled by the Treasurer concerning tourism"),
        );
        classifier().scan(&mut doc);

        assert_eq!(doc.keywords_found, vec!["tourism"]);
        assert_eq!(doc.alert_level, AlertTier::High);
    }

    #[test]
    fn no_matches_tier_info() {
        let mut doc = bill("Procedural Motion", None);
        classifier().scan(&mut doc);

        assert!(doc.keywords_found.is_empty());
        assert_eq!(doc.alert_level, AlertTier::Info);
    }

    #[test]
    fn substring_matching_has_no_word_boundaries() {
        // Accepted over-matching: "tax" matches inside "taxonomy".
        let mut doc = bill("Review of the species taxonomy register", None);
        classifier().scan(&mut doc);

        assert!(doc.keywords_found.iter().any(|k| k == "tax"));
        assert_eq!(doc.alert_level, AlertTier::Standard);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut doc = bill("GAMING REFORM BILL", None);
        classifier().scan(&mut doc);
        assert_eq!(doc.keywords_found, vec!["gaming"]);
    }

    #[tokio::test]
    async fn unreadable_pdf_leaves_body_empty_and_classifies_on_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"corrupt bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&ScrapingConfig {
            timeout_secs: 5,
            retry_attempts: 0,
            retry_delay_secs: 0,
            user_agent: "parlwatch-test".into(),
        })
        .unwrap();

        let mut doc = Document::new(
            "https://example.org/tabled",
            "Gaming levy report",
            DocumentType::TabledPaper,
        );
        doc.document_url = Some(format!("{}/paper.pdf", server.uri()));

        classifier().classify(&mut doc, &fetcher).await;

        assert!(doc.content_text.is_none());
        assert_eq!(doc.keywords_found, vec!["gaming"]);
        assert_eq!(doc.alert_level, AlertTier::Standard);
    }

    #[tokio::test]
    async fn non_pdf_url_skips_backfill_entirely() {
        // No server: a non-.pdf URL must never be fetched.
        let fetcher = Fetcher::new(&ScrapingConfig {
            timeout_secs: 5,
            retry_attempts: 0,
            retry_delay_secs: 0,
            user_agent: "parlwatch-test".into(),
        })
        .unwrap();

        let mut doc = bill("Gaming Reform Bill", None);
        doc.document_url = Some("https://example.invalid/bill-page".into());

        classifier().classify(&mut doc, &fetcher).await;
        assert!(doc.content_text.is_none());
        assert_eq!(doc.alert_level, AlertTier::Standard);
    }
}
