//! libSQL storage layer for documents, alerts, and scrape history.
//!
//! The [`Store`] struct wraps a local libSQL database. Each write is an
//! independent atomic statement; no transaction ever spans multiple
//! documents, so a crash mid-cycle loses nothing already committed.
//!
//! Deduplication rests entirely on the `documents.fingerprint` UNIQUE
//! constraint: [`Store::insert_document`] is `INSERT OR IGNORE`, and a
//! no-op insert is the signal that a candidate was already ingested.

mod migrations;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database, params};

use parlwatch_shared::{Alert, AlertTier, Document, DocumentType, MonitorError, Result, ScrapeRecord};

/// Primary storage handle wrapping a libSQL database.
pub struct Store {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Store {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MonitorError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    MonitorError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Idempotent insert keyed on the fingerprint UNIQUE constraint.
    ///
    /// Returns the new row id, or `None` when a document with the same
    /// fingerprint already exists. The no-op case is not an error: it is
    /// the concurrency-safety mechanism that keeps overlapping cycles from
    /// double-ingesting.
    pub async fn insert_document(&self, doc: &Document) -> Result<Option<i64>> {
        let keywords_json = serde_json::to_string(&doc.keywords_found)
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
        let date_published = doc.date_published.map(|d| d.to_string());
        let date_discovered = doc.date_discovered.to_rfc3339();
        let fingerprint = doc.fingerprint();

        let affected = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO documents (
                     source_url, document_url, title, description, document_type,
                     chamber, date_published, date_discovered, member, committee,
                     portfolio, fingerprint, content_text, keywords_found,
                     alert_level, processed
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    doc.source_url.as_str(),
                    doc.document_url.as_deref(),
                    doc.title.as_str(),
                    doc.description.as_deref(),
                    doc.document_type.as_str(),
                    doc.chamber.as_deref(),
                    date_published.as_deref(),
                    date_discovered.as_str(),
                    doc.member.as_deref(),
                    doc.committee.as_deref(),
                    doc.portfolio.as_deref(),
                    fingerprint.as_str(),
                    doc.content_text.as_deref(),
                    keywords_json.as_str(),
                    doc.alert_level.as_str(),
                    doc.processed as i64,
                ],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        if affected == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Whether a document with this fingerprint has already been ingested.
    pub async fn document_exists(&self, fingerprint: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM documents WHERE fingerprint = ?1",
                params![fingerprint],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| MonitorError::Storage(e.to_string()))?;
                Ok(count > 0)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(MonitorError::Storage(e.to_string())),
        }
    }

    /// Mark a document as processed. The only post-persistence mutation a
    /// document ever receives.
    pub async fn mark_processed(&self, document_id: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE documents SET processed = 1 WHERE id = ?1",
                params![document_id],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Most recently discovered documents, newest first. This is the
    /// projection the read-side API collaborator consumes.
    pub async fn recent_documents(&self, limit: u32) -> Result<Vec<Document>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source_url, document_url, title, description, document_type,
                        chamber, date_published, date_discovered, member, committee,
                        portfolio, content_text, keywords_found, alert_level, processed
                 FROM documents ORDER BY date_discovered DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_document(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Alert operations
    // -----------------------------------------------------------------------

    /// Insert an alert. Returns the new row id.
    pub async fn insert_alert(&self, alert: &Alert) -> Result<i64> {
        let date_created = alert.date_created.to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO alerts (document_id, alert_level, title, description,
                                     keywords_matched, date_created, sent)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    alert.document_id,
                    alert.tier.as_str(),
                    alert.title.as_str(),
                    alert.description.as_deref(),
                    alert.keywords_matched.as_str(),
                    date_created.as_str(),
                    alert.sent as i64,
                ],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Alerts not yet covered by a successful dispatch, oldest first, so a
    /// failed digest is retried on the next cycle.
    pub async fn unsent_alerts(&self) -> Result<Vec<Alert>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, document_id, alert_level, title, description,
                        keywords_matched, date_created, sent
                 FROM alerts WHERE sent = 0 ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_alert(&row)?);
        }
        Ok(results)
    }

    /// Mark alerts as covered by a successful dispatch.
    pub async fn mark_alerts_sent(&self, alert_ids: &[i64]) -> Result<()> {
        for id in alert_ids {
            self.conn
                .execute("UPDATE alerts SET sent = 1 WHERE id = ?1", params![*id])
                .await
                .map_err(|e| MonitorError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// Most recently dispatched alerts, newest first (read-side projection).
    pub async fn recent_sent_alerts(&self, limit: u32) -> Result<Vec<Alert>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, document_id, alert_level, title, description,
                        keywords_matched, date_created, sent
                 FROM alerts WHERE sent = 1 ORDER BY date_created DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_alert(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Scrape history
    // -----------------------------------------------------------------------

    /// Record the outcome of scraping one page in one cycle.
    pub async fn record_scrape(&self, record: &ScrapeRecord) -> Result<()> {
        let cycle_id = record.cycle_id.to_string();
        let timestamp = record.timestamp.to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO scrape_history (cycle_id, url, success, documents_found,
                                             error_message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    cycle_id.as_str(),
                    record.url.as_str(),
                    record.success as i64,
                    record.documents_found as i64,
                    record.error_message.as_deref(),
                    timestamp.as_str(),
                ],
            )
            .await
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MonitorError::Storage(format!("invalid timestamp: {e}")))
}

/// Convert a database row to a [`Document`].
fn row_to_document(row: &libsql::Row) -> Result<Document> {
    let keywords_json: String = row
        .get(13)
        .map_err(|e| MonitorError::Storage(e.to_string()))?;
    let keywords_found: Vec<String> = serde_json::from_str(&keywords_json)
        .map_err(|e| MonitorError::Storage(format!("invalid keywords column: {e}")))?;

    let document_type: String = row
        .get(5)
        .map_err(|e| MonitorError::Storage(e.to_string()))?;
    let alert_level: String = row
        .get(14)
        .map_err(|e| MonitorError::Storage(e.to_string()))?;

    Ok(Document {
        id: Some(
            row.get::<i64>(0)
                .map_err(|e| MonitorError::Storage(e.to_string()))?,
        ),
        source_url: row
            .get::<String>(1)
            .map_err(|e| MonitorError::Storage(e.to_string()))?,
        document_url: row.get::<String>(2).ok(),
        title: row
            .get::<String>(3)
            .map_err(|e| MonitorError::Storage(e.to_string()))?,
        description: row.get::<String>(4).ok(),
        document_type: DocumentType::from_str(&document_type).map_err(MonitorError::Storage)?,
        chamber: row.get::<String>(6).ok(),
        date_published: row
            .get::<String>(7)
            .ok()
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        date_discovered: {
            let s: String = row
                .get(8)
                .map_err(|e| MonitorError::Storage(e.to_string()))?;
            parse_utc(&s)?
        },
        member: row.get::<String>(9).ok(),
        committee: row.get::<String>(10).ok(),
        portfolio: row.get::<String>(11).ok(),
        content_text: row.get::<String>(12).ok(),
        keywords_found,
        alert_level: AlertTier::from_str(&alert_level).map_err(MonitorError::Storage)?,
        processed: row.get::<i64>(15).unwrap_or(0) != 0,
    })
}

/// Convert a database row to an [`Alert`].
fn row_to_alert(row: &libsql::Row) -> Result<Alert> {
    let alert_level: String = row
        .get(2)
        .map_err(|e| MonitorError::Storage(e.to_string()))?;

    Ok(Alert {
        id: Some(
            row.get::<i64>(0)
                .map_err(|e| MonitorError::Storage(e.to_string()))?,
        ),
        document_id: row
            .get::<i64>(1)
            .map_err(|e| MonitorError::Storage(e.to_string()))?,
        tier: AlertTier::from_str(&alert_level).map_err(MonitorError::Storage)?,
        title: row
            .get::<String>(3)
            .map_err(|e| MonitorError::Storage(e.to_string()))?,
        description: row.get::<String>(4).ok(),
        keywords_matched: row
            .get::<String>(5)
            .map_err(|e| MonitorError::Storage(e.to_string()))?,
        date_created: {
            let s: String = row
                .get(6)
                .map_err(|e| MonitorError::Storage(e.to_string()))?;
            parse_utc(&s)?
        },
        sent: row.get::<i64>(7).unwrap_or(0) != 0,
    })
}
