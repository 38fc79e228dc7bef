//! Interval scheduler driving full and partial monitoring cycles.
//!
//! A single coarse-grained polling loop checks per-kind due-times each
//! tick. Cycle execution is sequential; ticks missed during a long cycle
//! are coalesced (the next tick fires at most once, not once per missed
//! interval), and every deadline is rescheduled from cycle *completion*
//! time.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use parlwatch_shared::{MonitoringConfig, Result, SourceKind};

use crate::pipeline::Monitor;

/// The source kinds driven on independent intervals.
const PARTIAL_KINDS: [SourceKind; 3] = [
    SourceKind::TabledPapers,
    SourceKind::Bills,
    SourceKind::Committees,
];

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// Due-time bookkeeping for the full cycle and each partial kind.
struct Deadlines {
    next_full: Instant,
    partials: Vec<(SourceKind, Instant)>,
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

impl Deadlines {
    /// The first full cycle is due immediately; partials start one interval
    /// out, since the full cycle covers them.
    fn new(config: &MonitoringConfig, now: Instant) -> Self {
        Self {
            next_full: now,
            partials: PARTIAL_KINDS
                .iter()
                .map(|&kind| (kind, now + minutes(config.frequency_minutes(kind))))
                .collect(),
        }
    }

    fn full_due(&self, now: Instant) -> bool {
        now >= self.next_full
    }

    /// Reschedule everything after a completed full cycle: the full cycle
    /// refreshed every source, so partial deadlines restart too.
    fn reschedule_after_full(&mut self, config: &MonitoringConfig, now: Instant) {
        self.next_full = now + minutes(config.full_cycle_minutes);
        for (kind, deadline) in &mut self.partials {
            *deadline = now + minutes(config.frequency_minutes(*kind));
        }
    }

    fn due_partials(&self, now: Instant) -> Vec<SourceKind> {
        self.partials
            .iter()
            .filter(|(_, deadline)| now >= *deadline)
            .map(|(kind, _)| *kind)
            .collect()
    }

    fn reschedule_partial(&mut self, kind: SourceKind, config: &MonitoringConfig, now: Instant) {
        if let Some(entry) = self.partials.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = now + minutes(config.frequency_minutes(kind));
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives the monitor on its configured intervals until shutdown.
pub struct Scheduler {
    monitor: Monitor,
}

impl Scheduler {
    pub fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }

    /// Tick until the shutdown signal flips to `true`. Cycle errors are
    /// logged and the schedule keeps running; shutdown is checked
    /// cooperatively between per-source steps inside a cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let config = self.monitor.config().monitoring.clone();

        let poll = Duration::from_secs(config.poll_interval_secs.max(1));
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut deadlines = Deadlines::new(&config, Instant::now());

        // Cycles watch this clone; `shutdown` itself is reserved for the
        // select arm that waits on the signal.
        let cycle_shutdown = shutdown.clone();

        info!(
            poll_secs = poll.as_secs(),
            full_cycle_minutes = config.full_cycle_minutes,
            "scheduler started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *cycle_shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let now = Instant::now();

                    if deadlines.full_due(now) {
                        match self.monitor.run_cycle_cancellable(&cycle_shutdown).await {
                            Ok(report) => info!(
                                cycle_id = %report.cycle_id,
                                new_documents = report.new_documents.len(),
                                "full cycle finished"
                            ),
                            Err(e) => warn!(error = %e, "full cycle failed"),
                        }
                        deadlines.reschedule_after_full(&config, Instant::now());
                    } else {
                        for kind in deadlines.due_partials(now) {
                            if *cycle_shutdown.borrow() {
                                break;
                            }
                            match self.monitor.run_source_kind(kind, Some(&cycle_shutdown)).await {
                                Ok(report) => info!(
                                    kind = kind.as_str(),
                                    new_documents = report.new_documents.len(),
                                    "partial cycle finished"
                                ),
                                Err(e) => warn!(kind = kind.as_str(), error = %e, "partial cycle failed"),
                            }
                            deadlines.reschedule_partial(kind, &config, Instant::now());
                        }
                    }
                }
            }

            if *cycle_shutdown.borrow() {
                break;
            }
        }

        info!("scheduler stopped");
        Ok(())
    }

    /// The wrapped monitor, for read-side queries after shutdown.
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlwatch_shared::AppConfig;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> MonitoringConfig {
        MonitoringConfig::default()
    }

    #[test]
    fn full_cycle_due_immediately_partials_one_interval_out() {
        let now = Instant::now();
        let deadlines = Deadlines::new(&config(), now);

        assert!(deadlines.full_due(now));
        assert!(deadlines.due_partials(now).is_empty());

        // Tabled papers (15 min default) come due before bills (30 min).
        let later = now + minutes(16);
        let due = deadlines.due_partials(later);
        assert_eq!(due, vec![SourceKind::TabledPapers]);
    }

    #[test]
    fn full_cycle_resets_partial_deadlines() {
        let now = Instant::now();
        let mut deadlines = Deadlines::new(&config(), now);

        // Pretend the full cycle completed 20 minutes in; tabled papers had
        // just come due but the full cycle covered them.
        let completion = now + minutes(20);
        deadlines.reschedule_after_full(&config(), completion);

        assert!(!deadlines.full_due(completion + minutes(59)));
        assert!(deadlines.full_due(completion + minutes(60)));
        assert!(deadlines.due_partials(completion + minutes(14)).is_empty());
        assert_eq!(
            deadlines.due_partials(completion + minutes(15)),
            vec![SourceKind::TabledPapers]
        );
    }

    #[test]
    fn missed_ticks_coalesce_into_one_run() {
        let now = Instant::now();
        let mut deadlines = Deadlines::new(&config(), now);
        deadlines.reschedule_after_full(&config(), now);

        // 45 minutes late: three tabled-papers intervals were missed, but
        // one run reschedules from completion time, so only one is due.
        let late = now + minutes(60);
        assert_eq!(
            deadlines.due_partials(late),
            vec![
                SourceKind::TabledPapers,
                SourceKind::Bills,
                SourceKind::Committees
            ]
        );
        deadlines.reschedule_partial(SourceKind::TabledPapers, &config(), late);
        assert!(!deadlines.due_partials(late).contains(&SourceKind::TabledPapers));
    }

    #[tokio::test]
    async fn scheduler_runs_startup_cycle_and_stops_on_shutdown() {
        let server = MockServer::start().await;
        let bills_html = r#"<html><body>
            <div class="bill-row"><a href="/bills/x">Gaming Reform Bill</a></div>
        </body></html>"#;
        for p in ["/tabled", "/bills", "/committees"] {
            let body = if p == "/bills" { bills_html } else { "<html></html>" };
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let db_path = std::env::temp_dir().join(format!("parlwatch_sched_{}.db", Uuid::now_v7()));
        let mut app = AppConfig::default();
        app.database.path = db_path.to_string_lossy().into_owned();
        app.scraping.retry_attempts = 0;
        app.scraping.retry_delay_secs = 0;
        app.sources.site_root = server.uri();
        app.sources.urls = [
            ("house_tabled", format!("{}/tabled", server.uri())),
            ("bills", format!("{}/bills", server.uri())),
            ("committees_ha", format!("{}/committees", server.uri())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        app.monitoring.poll_interval_secs = 1;

        let monitor = Monitor::new(app).await.unwrap();
        let scheduler = Scheduler::new(monitor);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            scheduler.run(rx).await.unwrap();
            scheduler
        });

        // The first tick fires immediately and runs the startup full cycle;
        // wait for its writes to land, then shut down.
        let probe = parlwatch_storage::Store::open(&db_path).await.unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if !probe.recent_documents(10).await.unwrap().is_empty() {
                break;
            }
            assert!(Instant::now() < deadline, "startup cycle never ran");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tx.send(true).unwrap();
        let scheduler = handle.await.unwrap();

        let stored = scheduler.monitor().store().recent_documents(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Gaming Reform Bill");
    }
}
