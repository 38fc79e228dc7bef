//! Application configuration for parlwatch.
//!
//! User config lives at `~/.parlwatch/parlwatch.toml`.
//! Missing file or missing sections fall back to the built-in defaults,
//! which monitor the Tasmania Parliament site.
//!
//! Configuration is an immutable snapshot passed into component
//! constructors; "reload" means constructing a new pipeline with a fresh
//! snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::types::SourceKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "parlwatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".parlwatch";

// ---------------------------------------------------------------------------
// Config structs (matching parlwatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP fetch settings.
    #[serde(default)]
    pub scraping: ScrapingConfig,

    /// Monitored source registry.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Check intervals.
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Keyword watchlist, grouped by category.
    #[serde(default = "default_keywords")]
    pub keywords: BTreeMap<String, Vec<String>>,

    /// Alert escalation settings.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Notification transport settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            scraping: ScrapingConfig::default(),
            sources: SourcesConfig::default(),
            monitoring: MonitoringConfig::default(),
            keywords: default_keywords(),
            alerts: AlertsConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "parlwatch.db".into()
}

/// `[scraping]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the initial attempt (total attempts = retry_attempts + 1).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Linear delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ScrapingConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Inter-attempt delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_user_agent() -> String {
    concat!("parlwatch/", env!("CARGO_PKG_VERSION")).into()
}

/// `[sources]` section — the static source registry. Read-only to the
/// pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Site root used to absolutize relative document links.
    #[serde(default = "default_site_root")]
    pub site_root: String,

    /// Fetch URLs keyed by logical source name.
    #[serde(default = "default_source_urls")]
    pub urls: BTreeMap<String, String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            site_root: default_site_root(),
            urls: default_source_urls(),
        }
    }
}

fn default_site_root() -> String {
    "https://www.parliament.tas.gov.au".into()
}

fn default_source_urls() -> BTreeMap<String, String> {
    [
        (
            "house_tabled",
            "https://www.parliament.tas.gov.au/house-of-assembly/tabled-papers-2025",
        ),
        (
            "lc_tabled",
            "https://www.parliament.tas.gov.au/legislative-council/tpp",
        ),
        (
            "bills",
            "https://www.parliament.tas.gov.au/bills/bills-by-year",
        ),
        (
            "committees_ha",
            "https://www.parliament.tas.gov.au/house-of-assembly/committees",
        ),
        (
            "committees_lc",
            "https://www.parliament.tas.gov.au/legislative-council/committees",
        ),
        (
            "committees_joint",
            "https://www.parliament.tas.gov.au/parliamentary-committees/current-committees",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `[monitoring]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Scheduler tick granularity in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Interval between full cycles, in minutes.
    #[serde(default = "default_full_cycle_minutes")]
    pub full_cycle_minutes: u64,

    /// Per-source-kind check intervals, in minutes.
    #[serde(default = "default_frequencies")]
    pub frequencies: BTreeMap<String, u64>,
}

impl MonitoringConfig {
    /// Check interval for a source kind, falling back to the full-cycle
    /// interval when unconfigured.
    pub fn frequency_minutes(&self, kind: SourceKind) -> u64 {
        self.frequencies
            .get(kind.as_str())
            .copied()
            .unwrap_or(self.full_cycle_minutes)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            full_cycle_minutes: default_full_cycle_minutes(),
            frequencies: default_frequencies(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}
fn default_full_cycle_minutes() -> u64 {
    60
}
fn default_frequencies() -> BTreeMap<String, u64> {
    [("tabled_papers", 15), ("bills", 30), ("committees", 30)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_keywords() -> BTreeMap<String, Vec<String>> {
    let categories: &[(&str, &[&str])] = &[
        (
            "gaming_gambling",
            &[
                "gaming",
                "casino",
                "wagering",
                "betting",
                "gambling",
                "lottery",
                "pokies",
                "electronic gaming",
            ],
        ),
        (
            "infrastructure",
            &[
                "infrastructure",
                "construction",
                "roads",
                "bridges",
                "public works",
                "capital projects",
                "development",
            ],
        ),
        (
            "environment",
            &[
                "environment",
                "climate",
                "emissions",
                "pollution",
                "conservation",
                "renewable",
                "sustainability",
                "waste",
            ],
        ),
        (
            "health",
            &[
                "health",
                "hospital",
                "medical",
                "healthcare",
                "mental health",
                "aged care",
                "ambulance",
            ],
        ),
        (
            "business_economy",
            &[
                "business",
                "economy",
                "tax",
                "budget",
                "fiscal",
                "investment",
                "employment",
                "industry",
                "tourism",
            ],
        ),
        (
            "planning",
            &[
                "planning",
                "zoning",
                "land use",
                "development",
                "heritage",
                "building",
                "subdivision",
            ],
        ),
        (
            "aboriginal_affairs",
            &[
                "aboriginal",
                "indigenous",
                "reconciliation",
                "native title",
                "cultural heritage",
            ],
        ),
    ];

    categories
        .iter()
        .map(|(name, words)| {
            (
                name.to_string(),
                words.iter().map(|w| w.to_string()).collect(),
            )
        })
        .collect()
}

/// `[alerts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Keywords that escalate a document straight to the critical tier.
    #[serde(default = "default_critical_keywords")]
    pub critical_keywords: Vec<String>,

    /// Source names (ministers, portfolios) that escalate to the high tier.
    #[serde(default = "default_high_priority_sources")]
    pub high_priority_sources: Vec<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            critical_keywords: default_critical_keywords(),
            high_priority_sources: default_high_priority_sources(),
        }
    }
}

fn default_critical_keywords() -> Vec<String> {
    [
        "urgent",
        "immediate",
        "emergency",
        "crisis",
        "mandatory",
        "compliance",
        "penalty",
        "enforcement",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_high_priority_sources() -> Vec<String> {
    [
        "Premier",
        "Treasurer",
        "Attorney-General",
        "Minister for Health",
        "Minister for Infrastructure",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[notifications]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Master switch. When false, dispatch is a reported no-op.
    #[serde(default)]
    pub enabled: bool,

    /// Webhook transport settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// `[notifications.webhook]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Digest POST target.
    #[serde(default)]
    pub url: String,

    /// Name of the env var holding the bearer token (never store the token
    /// itself).
    #[serde(default = "default_token_env")]
    pub auth_token_env: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "PARLWATCH_WEBHOOK_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Monitored sources
// ---------------------------------------------------------------------------

/// A resolved entry of the source registry: logical name, fetch URL,
/// extraction kind, and (for tabled papers) the owning chamber.
#[derive(Debug, Clone)]
pub struct MonitoredSource {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub chamber: Option<String>,
}

impl AppConfig {
    /// Resolve the configured URL map into the sources the pipeline
    /// monitors: the two chamber tabled-paper pages, the bills list, and
    /// every source whose logical name contains "committee". Unknown keys
    /// are left to other collaborators.
    pub fn monitored_sources(&self) -> Vec<MonitoredSource> {
        let mut sources = Vec::new();

        for (name, chamber) in [
            ("house_tabled", "House of Assembly"),
            ("lc_tabled", "Legislative Council"),
        ] {
            if let Some(url) = self.sources.urls.get(name) {
                sources.push(MonitoredSource {
                    name: name.into(),
                    url: url.clone(),
                    kind: SourceKind::TabledPapers,
                    chamber: Some(chamber.into()),
                });
            }
        }

        if let Some(url) = self.sources.urls.get("bills") {
            sources.push(MonitoredSource {
                name: "bills".into(),
                url: url.clone(),
                kind: SourceKind::Bills,
                chamber: None,
            });
        }

        for (name, url) in &self.sources.urls {
            if name.contains("committee") {
                sources.push(MonitoredSource {
                    name: name.clone(),
                    url: url.clone(),
                    kind: SourceKind::Committees,
                    chamber: None,
                });
            }
        }

        sources
    }

    /// The flat keyword watchlist: sorted union of all categories, deduped.
    /// Classification scans keywords in exactly this order.
    pub fn alert_keywords(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .keywords
            .values()
            .flat_map(|words| words.iter().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.parlwatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MonitorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.parlwatch/parlwatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does
/// not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MonitorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MonitorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MonitorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MonitorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MonitorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("retry_attempts"));
        assert!(toml_str.contains("house_tabled"));
        assert!(toml_str.contains("critical_keywords"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.scraping.retry_attempts, 3);
        assert_eq!(parsed.scraping.retry_delay_secs, 5);
        assert_eq!(parsed.monitoring.full_cycle_minutes, 60);
    }

    #[test]
    fn partial_config_merges_with_defaults() {
        let toml_str = r#"
[scraping]
retry_attempts = 1

[notifications]
enabled = true

[notifications.webhook]
url = "https://hooks.example.org/parlwatch"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.scraping.retry_attempts, 1);
        // Untouched sections keep their defaults.
        assert_eq!(config.scraping.timeout_secs, 30);
        assert!(config.notifications.enabled);
        assert_eq!(
            config.notifications.webhook.url,
            "https://hooks.example.org/parlwatch"
        );
        assert!(!config.keywords.is_empty());
    }

    #[test]
    fn monitored_sources_resolve_kinds_and_chambers() {
        let config = AppConfig::default();
        let sources = config.monitored_sources();

        let house = sources.iter().find(|s| s.name == "house_tabled").unwrap();
        assert_eq!(house.kind, SourceKind::TabledPapers);
        assert_eq!(house.chamber.as_deref(), Some("House of Assembly"));

        let bills = sources.iter().find(|s| s.name == "bills").unwrap();
        assert_eq!(bills.kind, SourceKind::Bills);
        assert!(bills.chamber.is_none());

        let committees: Vec<_> = sources
            .iter()
            .filter(|s| s.kind == SourceKind::Committees)
            .collect();
        assert_eq!(committees.len(), 3);
    }

    #[test]
    fn alert_keywords_sorted_and_deduped() {
        let mut config = AppConfig::default();
        config.keywords.insert(
            "extra".into(),
            vec!["gaming".into(), "zzz-last".into(), "aaa-first".into()],
        );

        let keywords = config.alert_keywords();
        assert_eq!(keywords.first().map(String::as_str), Some("aaa-first"));
        assert_eq!(keywords.last().map(String::as_str), Some("zzz-last"));
        // "gaming" appears in two categories but only once in the union.
        assert_eq!(keywords.iter().filter(|k| *k == "gaming").count(), 1);
    }

    #[test]
    fn frequency_falls_back_to_full_cycle() {
        let config = MonitoringConfig::default();
        assert_eq!(config.frequency_minutes(SourceKind::TabledPapers), 15);
        assert_eq!(config.frequency_minutes(SourceKind::Bills), 30);

        let mut sparse = MonitoringConfig::default();
        sparse.frequencies.clear();
        assert_eq!(sparse.frequency_minutes(SourceKind::Bills), 60);
    }
}
