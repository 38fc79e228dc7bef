//! End-to-end monitoring cycle: fetch → extract → dedup → classify →
//! persist → notify.
//!
//! Per-page and per-document failures are isolated: one bad page or one bad
//! document never prevents ingestion of the rest of the cycle's candidates.
//! Only failure to open the store (at construction) is fatal. Partial
//! failures surface via tracing, not via the success return value.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use parlwatch_classify::Classifier;
use parlwatch_notify::{Dispatch, Notifier};
use parlwatch_scrape::{Extractor, Fetcher};
use parlwatch_shared::{
    Alert, AppConfig, CycleId, Document, MonitoredSource, Result, ScrapeRecord, SourceKind,
};
use parlwatch_storage::Store;

// ---------------------------------------------------------------------------
// CycleReport
// ---------------------------------------------------------------------------

/// Summary of one completed monitoring cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    /// Newly ingested documents that raised an alert, with ids set.
    pub new_documents: Vec<Document>,
    /// Pages fetched and extracted.
    pub pages_scraped: usize,
    /// Pages whose fetch failed after retries.
    pub pages_failed: usize,
    /// Digest outcome. `None` when there were no queued alerts or the
    /// transport failed (failures are logged; alerts stay queued).
    pub dispatch: Option<Dispatch>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// The monitoring pipeline over one configuration snapshot.
///
/// Reconfiguration means constructing a new `Monitor` with a new snapshot;
/// there is no shared mutable runtime state.
pub struct Monitor {
    config: AppConfig,
    fetcher: Fetcher,
    extractor: Extractor,
    classifier: Classifier,
    notifier: Notifier,
    store: Store,
}

impl Monitor {
    /// Build the pipeline. Failing to open the store is the one fatal error.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store = Store::open(Path::new(&config.database.path)).await?;
        let fetcher = Fetcher::new(&config.scraping)?;
        let extractor = Extractor::new(&config.sources.site_root)?;
        let classifier = Classifier::new(&config);
        let notifier = Notifier::new(&config.notifications)?;

        Ok(Self {
            config,
            fetcher,
            extractor,
            classifier,
            notifier,
            store,
        })
    }

    /// Run one full cycle across every monitored source.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let sources = self.config.monitored_sources();
        self.run_sources(&sources, None).await
    }

    /// Run one full cycle with a cooperative shutdown check between
    /// per-source steps. Termination never interrupts an in-flight write;
    /// stopping early simply stops issuing further fetches.
    pub async fn run_cycle_cancellable(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleReport> {
        let sources = self.config.monitored_sources();
        self.run_sources(&sources, Some(shutdown)).await
    }

    /// Run a partial cycle covering only sources of one kind.
    pub async fn run_source_kind(
        &self,
        kind: SourceKind,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<CycleReport> {
        let sources: Vec<MonitoredSource> = self
            .config
            .monitored_sources()
            .into_iter()
            .filter(|s| s.kind == kind)
            .collect();
        self.run_sources(&sources, shutdown).await
    }

    /// The cycle body. Sequential: one page fetch completes before the next
    /// begins, one document's insert completes before the next is attempted.
    #[instrument(skip_all, fields(cycle_id = tracing::field::Empty, sources = sources.len()))]
    async fn run_sources(
        &self,
        sources: &[MonitoredSource],
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<CycleReport> {
        let start = Instant::now();
        let cycle_id = CycleId::new();
        tracing::Span::current().record("cycle_id", tracing::field::display(&cycle_id));

        info!("starting monitoring cycle");

        // --- Fetch + extract ---
        let mut candidates: Vec<Document> = Vec::new();
        let mut pages_scraped = 0usize;
        let mut pages_failed = 0usize;

        for source in sources {
            if shutdown_requested(shutdown) {
                info!("shutdown requested, stopping cycle before next source");
                break;
            }

            match self.fetcher.fetch_page(&source.url).await {
                Ok(html) => {
                    let documents = self.extractor.extract(
                        source.kind,
                        &html,
                        &source.url,
                        source.chamber.as_deref(),
                    );
                    info!(
                        source = %source.name,
                        kind = source.kind.as_str(),
                        count = documents.len(),
                        "extracted candidates"
                    );
                    self.record_scrape(&cycle_id, &source.url, true, documents.len(), None)
                        .await;
                    pages_scraped += 1;
                    candidates.extend(documents);
                }
                Err(e) => {
                    // One bad page never aborts the cycle.
                    warn!(source = %source.name, error = %e, "page fetch failed");
                    self.record_scrape(&cycle_id, &source.url, false, 0, Some(e.to_string()))
                        .await;
                    pages_failed += 1;
                }
            }
        }

        // --- Dedup + classify + persist ---
        let mut new_documents: Vec<Document> = Vec::new();

        for mut doc in candidates {
            if shutdown_requested(shutdown) {
                info!("shutdown requested, stopping cycle before next document");
                break;
            }

            let fingerprint = doc.fingerprint();
            match self.store.document_exists(&fingerprint).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(title = %doc.title, error = %e, "existence check failed, skipping");
                    continue;
                }
            }

            self.classifier.classify(&mut doc, &self.fetcher).await;

            // The insert is the sole dedup gate: `None` means an overlapping
            // cycle got there first, so no alert is emitted here either.
            match self.store.insert_document(&doc).await {
                Ok(Some(id)) => {
                    doc.id = Some(id);

                    if !doc.keywords_found.is_empty() {
                        let alert = Alert::for_document(&doc, id);
                        match self.store.insert_alert(&alert).await {
                            Ok(_) => {
                                info!(
                                    title = %doc.title,
                                    tier = doc.alert_level.as_str(),
                                    keywords = doc.keywords_found.len(),
                                    "new document alerted"
                                );
                                new_documents.push(doc.clone());
                            }
                            Err(e) => warn!(title = %doc.title, error = %e, "alert insert failed"),
                        }
                    }

                    if let Err(e) = self.store.mark_processed(id).await {
                        warn!(document_id = id, error = %e, "mark_processed failed");
                    }
                }
                Ok(None) => {
                    debug!(title = %doc.title, "fingerprint already ingested, skipping");
                }
                Err(e) => {
                    warn!(title = %doc.title, error = %e, "document insert failed");
                }
            }
        }

        // --- Notify ---
        // The digest covers every queued alert, including ones left unsent
        // by a previously failed dispatch.
        let dispatch = self.dispatch_queued_alerts().await;

        let report = CycleReport {
            cycle_id,
            new_documents,
            pages_scraped,
            pages_failed,
            dispatch,
            elapsed: start.elapsed(),
        };

        info!(
            new_documents = report.new_documents.len(),
            pages_scraped = report.pages_scraped,
            pages_failed = report.pages_failed,
            elapsed_ms = report.elapsed.as_millis(),
            "monitoring cycle complete"
        );

        Ok(report)
    }

    /// Dispatch all unsent alerts as one digest and mark them sent on
    /// success. A transport failure leaves every alert queued for the next
    /// cycle.
    async fn dispatch_queued_alerts(&self) -> Option<Dispatch> {
        let unsent = match self.store.unsent_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(error = %e, "could not load queued alerts");
                return None;
            }
        };
        if unsent.is_empty() {
            return None;
        }

        match self.notifier.dispatch(&unsent).await {
            Ok(Dispatch::Disabled) => Some(Dispatch::Disabled),
            Ok(sent @ Dispatch::Sent { .. }) => {
                let ids: Vec<i64> = unsent.iter().filter_map(|a| a.id).collect();
                if let Err(e) = self.store.mark_alerts_sent(&ids).await {
                    warn!(error = %e, "failed to mark alerts sent");
                }
                Some(sent)
            }
            Err(e) => {
                warn!(error = %e, alerts = unsent.len(), "digest dispatch failed, alerts remain queued");
                None
            }
        }
    }

    /// Write one scrape-history row; history failures are logged, never
    /// propagated.
    async fn record_scrape(
        &self,
        cycle_id: &CycleId,
        url: &str,
        success: bool,
        documents_found: usize,
        error_message: Option<String>,
    ) {
        let record = ScrapeRecord {
            cycle_id: cycle_id.clone(),
            url: url.into(),
            success,
            documents_found,
            error_message,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.store.record_scrape(&record).await {
            warn!(url, error = %e, "failed to record scrape history");
        }
    }

    /// The underlying store, for read-side queries (export, reporting).
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The configuration snapshot this pipeline was built from.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn shutdown_requested(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.is_some_and(|rx| *rx.borrow())
}
