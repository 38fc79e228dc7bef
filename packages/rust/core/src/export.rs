//! JSON export of the read-side projection.
//!
//! Produces the snapshot the dashboard collaborator consumes: recent
//! documents, recently dispatched alerts, and summary statistics.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use parlwatch_shared::{Alert, AlertTier, AppConfig, Document, MonitorError, Result};
use parlwatch_storage::Store;

/// How many recent documents the export covers.
const EXPORT_DOCUMENT_LIMIT: u32 = 100;

/// How many dispatched alerts the export covers.
const EXPORT_ALERT_LIMIT: u32 = 50;

/// Summary statistics included in the export.
#[derive(Debug, Serialize)]
pub struct ExportStats {
    pub total_documents: usize,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub keywords_tracked: usize,
}

/// The exported snapshot.
#[derive(Debug, Serialize)]
pub struct ExportData {
    pub last_updated: DateTime<Utc>,
    pub documents: Vec<Document>,
    pub alerts: Vec<Alert>,
    pub stats: ExportStats,
}

/// Export recent documents and dispatched alerts to a pretty-printed JSON
/// file. Returns the exported data for reporting.
pub async fn export_to_json(
    store: &Store,
    config: &AppConfig,
    output: &Path,
) -> Result<ExportData> {
    let documents = store.recent_documents(EXPORT_DOCUMENT_LIMIT).await?;
    let alerts = store.recent_sent_alerts(EXPORT_ALERT_LIMIT).await?;

    let stats = ExportStats {
        total_documents: documents.len(),
        critical_alerts: alerts.iter().filter(|a| a.tier == AlertTier::Critical).count(),
        high_alerts: alerts.iter().filter(|a| a.tier == AlertTier::High).count(),
        keywords_tracked: config.alert_keywords().len(),
    };

    let data = ExportData {
        last_updated: Utc::now(),
        documents,
        alerts,
        stats,
    };

    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| MonitorError::validation(format!("export serialization failed: {e}")))?;
    std::fs::write(output, json).map_err(|e| MonitorError::io(output, e))?;

    info!(
        path = %output.display(),
        documents = data.documents.len(),
        alerts = data.alerts.len(),
        "exported data"
    );

    Ok(data)
}
