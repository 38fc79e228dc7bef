//! Digest notification dispatch.
//!
//! New alerts are batched into a single digest per cycle, grouped by tier
//! in (critical, high, standard) order with discovery order preserved
//! within each group, and delivered with one webhook POST. A transport
//! failure fails the whole digest — no partial delivery — leaving every
//! alert unsent and eligible for the next cycle's digest.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use parlwatch_shared::{Alert, AlertTier, MonitorError, NotificationsConfig, Result};

// ---------------------------------------------------------------------------
// Dispatch outcome
// ---------------------------------------------------------------------------

/// Outcome of a dispatch call. Callers must observe "notifications are
/// disabled" distinctly from "a digest was sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Notifications are disabled in configuration; nothing was sent.
    Disabled,
    /// A digest covering `count` alerts was delivered (zero alerts means no
    /// POST was necessary).
    Sent { count: usize },
}

// ---------------------------------------------------------------------------
// Digest payload
// ---------------------------------------------------------------------------

/// The JSON digest body delivered to the webhook.
#[derive(Debug, Serialize)]
pub struct Digest {
    pub subject: String,
    pub generated_at: DateTime<Utc>,
    /// Present tiers only, in (critical, high, standard) order.
    pub sections: Vec<DigestSection>,
}

/// One tier's worth of alerts within a digest.
#[derive(Debug, Serialize)]
pub struct DigestSection {
    pub tier: AlertTier,
    pub alerts: Vec<DigestEntry>,
}

/// A single alert as rendered into the digest.
#[derive(Debug, Serialize)]
pub struct DigestEntry {
    pub document_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub keywords_matched: String,
}

/// Group alerts into a digest: one section per present tier, (critical,
/// high, standard) order, input order preserved within each section.
pub fn build_digest(alerts: &[Alert]) -> Digest {
    let mut sections = Vec::new();

    for tier in [AlertTier::Critical, AlertTier::High, AlertTier::Standard] {
        let entries: Vec<DigestEntry> = alerts
            .iter()
            .filter(|a| a.tier == tier)
            .map(|a| DigestEntry {
                document_id: a.document_id,
                title: a.title.clone(),
                description: a.description.clone(),
                keywords_matched: a.keywords_matched.clone(),
            })
            .collect();

        if !entries.is_empty() {
            sections.push(DigestSection {
                tier,
                alerts: entries,
            });
        }
    }

    let critical = alerts.iter().filter(|a| a.tier == AlertTier::Critical).count();
    let high = alerts.iter().filter(|a| a.tier == AlertTier::High).count();

    Digest {
        subject: format!("Parliament Monitor Alert - {critical} Critical, {high} High Priority"),
        generated_at: Utc::now(),
        sections,
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Sends digest notifications over a webhook transport.
pub struct Notifier {
    enabled: bool,
    webhook_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl Notifier {
    /// Build a notifier from a configuration snapshot. The bearer token is
    /// resolved from the configured env var once, at construction.
    pub fn new(config: &NotificationsConfig) -> Result<Self> {
        if config.enabled && config.webhook.url.is_empty() {
            return Err(MonitorError::config(
                "notifications are enabled but [notifications.webhook] url is empty",
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| MonitorError::Notify(format!("failed to build HTTP client: {e}")))?;

        let auth_token = std::env::var(&config.webhook.auth_token_env)
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            enabled: config.enabled,
            webhook_url: config.webhook.url.clone(),
            auth_token,
            client,
        })
    }

    /// Deliver one digest covering all given alerts.
    ///
    /// A single send failure fails the whole digest; the caller keeps the
    /// alerts unsent so they roll into the next cycle's digest.
    #[instrument(skip_all, fields(alerts = alerts.len()))]
    pub async fn dispatch(&self, alerts: &[Alert]) -> Result<Dispatch> {
        if !self.enabled {
            debug!("notifications disabled, skipping dispatch");
            return Ok(Dispatch::Disabled);
        }
        if alerts.is_empty() {
            return Ok(Dispatch::Sent { count: 0 });
        }

        let digest = build_digest(alerts);

        let mut request = self.client.post(&self.webhook_url).json(&digest);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MonitorError::Notify(format!("{}: {e}", self.webhook_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Notify(format!(
                "{}: HTTP {status}",
                self.webhook_url
            )));
        }

        info!(alerts = alerts.len(), "digest dispatched");
        Ok(Dispatch::Sent {
            count: alerts.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlwatch_shared::WebhookConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert(id: i64, tier: AlertTier, title: &str) -> Alert {
        Alert {
            id: Some(id),
            document_id: id,
            tier,
            title: title.into(),
            description: None,
            keywords_matched: "gaming".into(),
            date_created: Utc::now(),
            sent: false,
        }
    }

    fn webhook_config(url: &str, enabled: bool) -> NotificationsConfig {
        NotificationsConfig {
            enabled,
            webhook: WebhookConfig {
                url: url.into(),
                // Point at an env var that is never set, so tests don't pick
                // up ambient tokens.
                auth_token_env: "PARLWATCH_TEST_UNSET_TOKEN".into(),
            },
        }
    }

    #[test]
    fn digest_groups_tiers_in_fixed_order() {
        let alerts = vec![
            alert(1, AlertTier::Standard, "standard-first"),
            alert(2, AlertTier::Critical, "critical-first"),
            alert(3, AlertTier::High, "high-first"),
            alert(4, AlertTier::Critical, "critical-second"),
            alert(5, AlertTier::Standard, "standard-second"),
        ];

        let digest = build_digest(&alerts);

        let tiers: Vec<AlertTier> = digest.sections.iter().map(|s| s.tier).collect();
        assert_eq!(
            tiers,
            vec![AlertTier::Critical, AlertTier::High, AlertTier::Standard]
        );

        // Discovery order preserved within each tier.
        let critical: Vec<&str> = digest.sections[0]
            .alerts
            .iter()
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(critical, vec!["critical-first", "critical-second"]);

        assert_eq!(digest.subject, "Parliament Monitor Alert - 2 Critical, 1 High Priority");
    }

    #[test]
    fn digest_omits_absent_tiers() {
        let alerts = vec![alert(1, AlertTier::Standard, "only-standard")];
        let digest = build_digest(&alerts);
        assert_eq!(digest.sections.len(), 1);
        assert_eq!(digest.sections[0].tier, AlertTier::Standard);
    }

    #[tokio::test]
    async fn disabled_dispatch_reports_disabled_without_sending() {
        let notifier = Notifier::new(&webhook_config("", false)).unwrap();
        let result = notifier
            .dispatch(&[alert(1, AlertTier::Critical, "x")])
            .await
            .unwrap();
        assert_eq!(result, Dispatch::Disabled);
    }

    #[tokio::test]
    async fn enabled_without_url_is_a_config_error() {
        assert!(Notifier::new(&webhook_config("", true)).is_err());
    }

    #[tokio::test]
    async fn mixed_tiers_produce_exactly_one_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/digest"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            Notifier::new(&webhook_config(&format!("{}/digest", server.uri()), true)).unwrap();

        let alerts = vec![
            alert(1, AlertTier::Critical, "a"),
            alert(2, AlertTier::High, "b"),
            alert(3, AlertTier::Standard, "c"),
        ];
        let result = notifier.dispatch(&alerts).await.unwrap();
        assert_eq!(result, Dispatch::Sent { count: 3 });
        server.verify().await;
    }

    #[tokio::test]
    async fn transport_failure_fails_the_whole_digest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(&webhook_config(&server.uri(), true)).unwrap();
        let result = notifier.dispatch(&[alert(1, AlertTier::High, "x")]).await;

        assert!(matches!(result, Err(MonitorError::Notify(_))));
    }

    #[tokio::test]
    async fn empty_alert_list_sends_nothing() {
        // No server: an empty list must not POST anywhere.
        let notifier =
            Notifier::new(&webhook_config("https://example.invalid/digest", true)).unwrap();
        let result = notifier.dispatch(&[]).await.unwrap();
        assert_eq!(result, Dispatch::Sent { count: 0 });
    }
}
