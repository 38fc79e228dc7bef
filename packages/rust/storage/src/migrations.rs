//! SQL migration definitions for the parlwatch database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: documents, alerts, scrape_history",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Discovered parliamentary documents. The fingerprint UNIQUE constraint is
-- the sole deduplication gate across cycles.
CREATE TABLE IF NOT EXISTS documents (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url      TEXT NOT NULL,
    document_url    TEXT,
    title           TEXT NOT NULL,
    description     TEXT,
    document_type   TEXT NOT NULL,
    chamber         TEXT,
    date_published  TEXT,
    date_discovered TEXT NOT NULL,
    member          TEXT,
    committee       TEXT,
    portfolio       TEXT,
    fingerprint     TEXT NOT NULL UNIQUE,
    content_text    TEXT,
    keywords_found  TEXT NOT NULL DEFAULT '[]',
    alert_level     TEXT NOT NULL,
    processed       INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_documents_discovered ON documents(date_discovered);
CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(document_type);

-- Alerts raised for novel, keyword-matching documents
CREATE TABLE IF NOT EXISTS alerts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id      INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    alert_level      TEXT NOT NULL,
    title            TEXT NOT NULL,
    description      TEXT,
    keywords_matched TEXT NOT NULL,
    date_created     TEXT NOT NULL,
    sent             INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_alerts_sent ON alerts(sent);

-- Per-page scrape observability
CREATE TABLE IF NOT EXISTS scrape_history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    cycle_id        TEXT NOT NULL,
    url             TEXT NOT NULL,
    success         INTEGER NOT NULL,
    documents_found INTEGER NOT NULL,
    error_message   TEXT,
    timestamp       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scrape_history_cycle ON scrape_history(cycle_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
