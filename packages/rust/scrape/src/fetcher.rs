//! HTTP fetcher with bounded linear retry.
//!
//! Every monitored page goes through [`Fetcher::fetch_page`]; linked PDFs go
//! through [`Fetcher::fetch_pdf`], which additionally gates on the declared
//! content type. Retry state never crosses URLs: failure of one page does
//! not affect any other.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use parlwatch_shared::{MonitorError, Result, ScrapingConfig};

/// HTTP client for monitored pages and linked documents.
pub struct Fetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Create a fetcher with the configured timeout and user agent.
    pub fn new(config: &ScrapingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout())
            .build()
            .map_err(|e| MonitorError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
        })
    }

    /// Fetch a page body as text.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.get_with_retry(url).await?;
        response
            .text()
            .await
            .map_err(|e| MonitorError::Fetch(format!("{url}: body read failed: {e}")))
    }

    /// Fetch a linked PDF.
    ///
    /// Returns `Ok(None)` when the response is not declared as
    /// `application/pdf` — many pages link non-PDF resources under similar
    /// paths, so a mismatch is "no content", not a failure.
    pub async fn fetch_pdf(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self.get_with_retry(url).await?;

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/pdf"));

        if !is_pdf {
            debug!(%url, "response is not a PDF, skipping");
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MonitorError::Fetch(format!("{url}: body read failed: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }

    /// One GET with up to `retry_attempts` retries on network error or
    /// non-2xx status, sleeping a fixed delay between attempts. Total
    /// attempts = `retry_attempts + 1`; the surfaced error carries the last
    /// underlying failure.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_error = String::new();

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    last_error = format!("HTTP {}", response.status());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            warn!(%url, attempt = attempt + 1, error = %last_error, "fetch attempt failed");
        }

        Err(MonitorError::Fetch(format!(
            "{url}: {last_error} (after {} attempts)",
            self.retry_attempts + 1
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> ScrapingConfig {
        ScrapingConfig {
            timeout_secs: 5,
            retry_attempts: 3,
            retry_delay_secs: 0,
            user_agent: "parlwatch-test".into(),
        }
    }

    #[tokio::test]
    async fn fetch_page_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tabled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>papers</html>"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let body = fetcher
            .fetch_page(&format!("{}/tabled", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>papers</html>");
    }

    #[tokio::test]
    async fn permanent_failure_issues_exactly_attempts_plus_one_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let result = fetcher.fetch_page(&format!("{}/down", server.uri())).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
        assert!(err.to_string().contains("after 4 attempts"));
        server.verify().await;
    }

    #[tokio::test]
    async fn transient_failure_recovers_within_retry_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let body = fetcher
            .fetch_page(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn fetch_pdf_gates_on_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.7 fake".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/not-a-pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();

        let pdf = fetcher
            .fetch_pdf(&format!("{}/doc.pdf", server.uri()))
            .await
            .unwrap();
        assert!(pdf.is_some());
        assert!(pdf.unwrap().starts_with(b"%PDF"));

        // Content-type mismatch is "no content", not an error.
        let not_pdf = fetcher
            .fetch_pdf(&format!("{}/not-a-pdf", server.uri()))
            .await
            .unwrap();
        assert!(not_pdf.is_none());
    }
}
