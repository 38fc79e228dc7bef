//! Core domain types for parliamentary document monitoring.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CycleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for monitoring-cycle identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub Uuid);

impl CycleId {
    /// Generate a new time-sortable cycle identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentType
// ---------------------------------------------------------------------------

/// The kind of parliamentary artifact a document represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    TabledPaper,
    Bill,
    CommitteeReport,
    Hansard,
    Register,
    StandingOrder,
    Other,
}

impl DocumentType {
    /// Stable string form, used in the database and the read-side projection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabledPaper => "tabled_paper",
            Self::Bill => "bill",
            Self::CommitteeReport => "committee_report",
            Self::Hansard => "hansard",
            Self::Register => "register",
            Self::StandingOrder => "standing_order",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tabled_paper" => Ok(Self::TabledPaper),
            "bill" => Ok(Self::Bill),
            "committee_report" => Ok(Self::CommitteeReport),
            "hansard" => Ok(Self::Hansard),
            "register" => Ok(Self::Register),
            "standing_order" => Ok(Self::StandingOrder),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertTier
// ---------------------------------------------------------------------------

/// Alert priority assigned to a document at classification time.
///
/// Precedence is fixed: critical keyword presence always outranks keyword
/// count, and keyword count only ever elevates to `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    Critical,
    High,
    Standard,
    Info,
}

impl AlertTier {
    /// Stable string form, used in the database and the read-side projection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Standard => "standard",
            Self::Info => "info",
        }
    }
}

impl std::str::FromStr for AlertTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "standard" => Ok(Self::Standard),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown alert tier: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The logical category of a monitored page, determining which extraction
/// rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Chamber tabled-papers listing page.
    TabledPapers,
    /// Bills-by-year listing page.
    Bills,
    /// Committees listing page.
    Committees,
}

impl SourceKind {
    /// Human-readable name for tracing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabledPapers => "tabled_papers",
            Self::Bills => "bills",
            Self::Committees => "committees",
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A discovered parliamentary document.
///
/// Created by the extractor with `processed = false`, mutated in place by the
/// classifier (body text backfill, keyword list, tier) before first
/// persistence. Once persisted, only `processed` is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Database row id, set after insertion.
    pub id: Option<i64>,
    /// The monitored page this document was discovered on.
    pub source_url: String,
    /// Direct link to the document itself, when one was extracted.
    pub document_url: Option<String>,
    /// Document title. Required and non-empty.
    pub title: String,
    /// Short description (bill reading stage, inquiry text, ...).
    pub description: Option<String>,
    pub document_type: DocumentType,
    pub chamber: Option<String>,
    pub date_published: Option<NaiveDate>,
    /// Set at creation, immutable afterwards.
    pub date_discovered: DateTime<Utc>,
    pub member: Option<String>,
    pub committee: Option<String>,
    pub portfolio: Option<String>,
    /// Extracted body text (e.g. from a linked PDF).
    pub content_text: Option<String>,
    /// Matched keywords, unique, in first-match order.
    pub keywords_found: Vec<String>,
    pub alert_level: AlertTier,
    pub processed: bool,
}

impl Document {
    /// Create a fresh, unclassified document discovered now.
    pub fn new(source_url: impl Into<String>, title: impl Into<String>, kind: DocumentType) -> Self {
        Self {
            id: None,
            source_url: source_url.into(),
            document_url: None,
            title: title.into(),
            description: None,
            document_type: kind,
            chamber: None,
            date_published: None,
            date_discovered: Utc::now(),
            member: None,
            committee: None,
            portfolio: None,
            content_text: None,
            keywords_found: Vec::new(),
            alert_level: AlertTier::Info,
            processed: false,
        }
    }

    /// Compute the deduplication fingerprint: SHA-256 of a type-specific
    /// canonical string.
    ///
    /// Identical titles recurring under different chambers or dates are
    /// distinct tabled papers, whereas bill titles are unique on their own
    /// and committee updates are keyed by name + inquiry text. This
    /// asymmetry mirrors identifier stability per source kind.
    pub fn fingerprint(&self) -> String {
        let canonical = match self.document_type {
            DocumentType::Bill => self.title.clone(),
            DocumentType::CommitteeReport => format!(
                "{}{}",
                self.committee.as_deref().unwrap_or_default(),
                self.description.as_deref().unwrap_or_default(),
            ),
            // An unset date renders as the literal `None`, so papers with and
            // without dates never collide.
            _ => format!(
                "{}{}{:?}",
                self.title,
                self.chamber.as_deref().unwrap_or_default(),
                self.date_published,
            ),
        };

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A notification-worthy projection of a [`Document`].
///
/// Created only for documents that are both newly discovered and have at
/// least one matched keyword. Immutable after creation except `sent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Database row id, set after insertion.
    pub id: Option<i64>,
    pub document_id: i64,
    pub tier: AlertTier,
    pub title: String,
    pub description: Option<String>,
    /// Comma-joined matched keywords, in first-match order.
    pub keywords_matched: String,
    pub date_created: DateTime<Utc>,
    pub sent: bool,
}

impl Alert {
    /// Build an alert from a persisted, classified document.
    pub fn for_document(doc: &Document, document_id: i64) -> Self {
        Self {
            id: None,
            document_id,
            tier: doc.alert_level,
            title: doc.title.clone(),
            description: doc.description.clone(),
            keywords_matched: doc.keywords_found.join(", "),
            date_created: Utc::now(),
            sent: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ScrapeRecord
// ---------------------------------------------------------------------------

/// Per-page scrape-history row, written once per fetched page per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRecord {
    pub cycle_id: CycleId,
    pub url: String,
    pub success: bool,
    pub documents_found: usize,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}
