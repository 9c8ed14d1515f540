//! Poll loop implementation.
//!
//! One sequential control flow per cycle:
//! - Fetch: concurrent, one request per tracked entity
//! - Claim + dispatch: sequential, one lot at a time
//! - Persist: once per cycle and once more at shutdown

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::PollerConfig;
use crate::metrics;
use crate::notify::{application_email, new_lot_message, Dispatcher, Notification};
use crate::render::{DocumentRenderer, RenderError, RenderedDocument};
use crate::seen::{SeenSet, SeenStore, StoreError};
use crate::source::{CandidateLot, LotSource, TrackedEntity};

use super::types::{CycleReport, PollError, PollState, PollStats};

/// The poll loop: owns the seen set and drives lots from source to inbox.
pub struct LotPoller {
    config: PollerConfig,
    entities: Vec<TrackedEntity>,
    source: Arc<dyn LotSource>,
    renderer: Arc<dyn DocumentRenderer>,
    chat: Option<Arc<dyn Dispatcher>>,
    mail: Option<Arc<dyn Dispatcher>>,
    store: SeenStore,
    seen: SeenSet,
    stats: Arc<PollStats>,
}

impl LotPoller {
    /// Create a poller, loading the seen set from `store`.
    ///
    /// An unreadable or corrupt seen-set file starts the poller with an
    /// empty set.
    pub async fn new(
        config: PollerConfig,
        entities: Vec<TrackedEntity>,
        source: Arc<dyn LotSource>,
        renderer: Arc<dyn DocumentRenderer>,
        store: SeenStore,
    ) -> Self {
        let seen = store.load().await;
        let stats = Arc::new(PollStats::new());
        stats.set_tracked_entities(entities.len());
        stats.set_seen_lots(seen.len());
        metrics::SEEN_LOTS.set(seen.len() as i64);

        Self {
            config,
            entities,
            source,
            renderer,
            chat: None,
            mail: None,
            store,
            seen,
            stats,
        }
    }

    /// Announce new lots over a chat channel.
    pub fn with_chat(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.chat = Some(dispatcher);
        self
    }

    /// Mail the rendered application for new lots.
    pub fn with_mail(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.mail = Some(dispatcher);
        self
    }

    /// Shared counters, readable while the loop runs.
    pub fn stats(&self) -> Arc<PollStats> {
        Arc::clone(&self.stats)
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Run until `shutdown` turns true (or `max_cycles` is reached), then
    /// flush the seen set.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            entities = self.entities.len(),
            seen = self.seen.len(),
            interval_secs = self.config.interval_secs,
            "Poll loop started"
        );

        let mut cycles: u32 = 0;
        loop {
            if *shutdown.borrow() {
                info!("Poll loop received shutdown signal");
                break;
            }

            self.stats.set_state(PollState::Polling);
            let started = std::time::Instant::now();

            let delay = match self.run_cycle(&shutdown).await {
                Ok(report) => {
                    metrics::CYCLES_TOTAL.with_label_values(&["ok"]).inc();
                    metrics::CYCLE_DURATION
                        .with_label_values(&["ok"])
                        .observe(started.elapsed().as_secs_f64());
                    info!(
                        candidates = report.candidates,
                        dispatched = report.dispatched,
                        failed = report.failed,
                        skipped = report.skipped_seen,
                        entities_failed = report.entities_failed,
                        "Poll cycle finished"
                    );
                    Duration::from_secs(self.config.interval_secs)
                }
                Err(e) => {
                    metrics::CYCLES_TOTAL
                        .with_label_values(&["source_unavailable"])
                        .inc();
                    metrics::CYCLE_DURATION
                        .with_label_values(&["source_unavailable"])
                        .observe(started.elapsed().as_secs_f64());
                    error!(
                        error = %e,
                        backoff_secs = self.config.error_backoff_secs,
                        "Poll cycle failed"
                    );
                    self.stats.record_cycle(Utc::now());
                    Duration::from_secs(self.config.error_backoff_secs)
                }
            };

            cycles += 1;
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                info!(cycles, "Reached configured cycle limit");
                break;
            }

            self.stats.set_state(PollState::Sleeping);
            if !wait_or_stop(&mut shutdown, delay).await {
                info!("Poll loop received shutdown signal");
                break;
            }
        }

        self.stats.set_state(PollState::Stopping);
        if let Err(e) = self.persist().await {
            error!(error = %e, "Failed to save seen set at shutdown");
        }
        self.stats.set_state(PollState::Stopped);
        info!(seen = self.seen.len(), "Poll loop stopped");
    }

    /// Run one poll cycle.
    ///
    /// Per-entity fetch failures are logged and skipped; only a cycle in
    /// which every fetch failed is an error. Lots are claimed in the seen
    /// set before any delivery is attempted, so a lot whose delivery fails
    /// is not retried. A failed save is logged and retried next cycle.
    pub async fn run_cycle(
        &mut self,
        stop: &watch::Receiver<bool>,
    ) -> Result<CycleReport, PollError> {
        let mut report = CycleReport {
            entities: self.entities.len(),
            ..Default::default()
        };

        let source = &self.source;
        let fetches = join_all(self.entities.iter().map(|entity| async move {
            (entity.clone(), source.list_candidates(entity).await)
        }))
        .await;

        let mut batches = Vec::with_capacity(fetches.len());
        for (entity, result) in fetches {
            match result {
                Ok(lots) => {
                    metrics::SOURCE_FETCHES
                        .with_label_values(&[self.source.name(), "ok"])
                        .inc();
                    metrics::CANDIDATES_FOUND
                        .with_label_values(&[self.source.name()])
                        .observe(lots.len() as f64);
                    debug!(entity = %entity, lots = lots.len(), "Fetched candidates");
                    report.candidates += lots.len();
                    batches.push((entity, lots));
                }
                Err(e) => {
                    metrics::SOURCE_FETCHES
                        .with_label_values(&[self.source.name(), "error"])
                        .inc();
                    warn!(entity = %entity, error = %e, "Failed to fetch lots");
                    self.stats.record_source_failure();
                    report.entities_failed += 1;
                }
            }
        }

        if report.entities > 0 && report.entities_failed == report.entities {
            return Err(PollError::SourceUnavailable {
                failed: report.entities_failed,
            });
        }

        'entities: for (entity, lots) in batches {
            for lot in lots {
                if *stop.borrow() {
                    report.interrupted = true;
                    break 'entities;
                }

                if let Some(lot_id) = lot.lot_id.as_deref() {
                    if !self.seen.claim(lot_id) {
                        metrics::LOTS_TOTAL.with_label_values(&["skipped_seen"]).inc();
                        report.skipped_seen += 1;
                        continue;
                    }
                    self.stats.set_seen_lots(self.seen.len());
                    metrics::SEEN_LOTS.set(self.seen.len() as i64);
                }

                if self.process_lot(&entity, lot).await {
                    metrics::LOTS_TOTAL.with_label_values(&["dispatched"]).inc();
                    self.stats.record_dispatched();
                    report.dispatched += 1;
                } else {
                    metrics::LOTS_TOTAL.with_label_values(&["failed"]).inc();
                    self.stats.record_lot_failure();
                    report.failed += 1;
                }
            }
        }

        match self.persist().await {
            Ok(()) => report.saved = true,
            Err(e) => error!(error = %e, "Failed to save seen set"),
        }

        self.stats.record_cycle(Utc::now());
        Ok(report)
    }

    /// Deliver one claimed lot. Returns false if any step failed.
    async fn process_lot(&self, entity: &TrackedEntity, lot: CandidateLot) -> bool {
        let lot = self.enrich(lot).await;
        info!(
            entity = %entity,
            lot_id = lot.lot_id.as_deref().unwrap_or("-"),
            lot_number = lot.lot_number_or_na(),
            "New lot"
        );

        let mut delivered = true;

        if let Some(chat) = &self.chat {
            delivered &= deliver(chat.as_ref(), &new_lot_message(&lot)).await;
        }

        if let Some(mail) = &self.mail {
            match self.render(entity, &lot).await {
                Ok(document) => {
                    metrics::RENDERS_TOTAL.with_label_values(&["ok"]).inc();
                    let email =
                        application_email(&lot, document.attachment(), Local::now().naive_local());
                    delivered &= deliver(mail.as_ref(), &email).await;
                    // Dropping the guard removes the file whether or not mailing worked.
                    drop(document);
                }
                Err(e) => {
                    metrics::RENDERS_TOTAL.with_label_values(&["error"]).inc();
                    error!(
                        entity = %entity,
                        renderer = self.renderer.name(),
                        error = %e,
                        "Failed to render application"
                    );
                    delivered = false;
                }
            }
        }

        delivered
    }

    /// Rendering embeds fonts and writes the file synchronously, so it runs
    /// on the blocking pool.
    async fn render(
        &self,
        entity: &TrackedEntity,
        lot: &CandidateLot,
    ) -> Result<RenderedDocument, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let (entity, lot) = (entity.clone(), lot.clone());
        tokio::task::spawn_blocking(move || renderer.render(&entity, &lot))
            .await
            .unwrap_or_else(|e| Err(RenderError::Task(e.to_string())))
    }

    /// Fetch full details for a partial lot; on any failure keep what we have.
    async fn enrich(&self, lot: CandidateLot) -> CandidateLot {
        if !lot.is_partial() {
            return lot;
        }
        let Some(lot_id) = lot.lot_id.clone() else {
            return lot;
        };

        match self.source.get_detail(&lot_id).await {
            Ok(Some(detail)) => lot.merge_detail(detail),
            Ok(None) => lot,
            Err(e) => {
                warn!(lot_id = %lot_id, error = %e, "Failed to fetch lot details");
                lot
            }
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        match self.store.save(&self.seen).await {
            Ok(()) => {
                metrics::STORE_SAVES.with_label_values(&["ok"]).inc();
                Ok(())
            }
            Err(e) => {
                metrics::STORE_SAVES.with_label_values(&["error"]).inc();
                Err(e)
            }
        }
    }
}

async fn deliver(dispatcher: &dyn Dispatcher, notification: &Notification) -> bool {
    match dispatcher.send(notification).await {
        Ok(()) => {
            metrics::DELIVERIES_TOTAL
                .with_label_values(&[dispatcher.name(), "ok"])
                .inc();
            true
        }
        Err(e) => {
            metrics::DELIVERIES_TOTAL
                .with_label_values(&[dispatcher.name(), "error"])
                .inc();
            error!(channel = dispatcher.name(), error = %e, "Delivery failed");
            false
        }
    }
}

/// Sleep for `delay` unless a stop is requested first.
/// Returns false when the loop should stop.
async fn wait_or_stop(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *shutdown.borrow() {
        return false;
    }

    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return true,
            changed = shutdown.changed() => {
                // A dropped sender can never signal again; treat it as a stop.
                if changed.is_err() || *shutdown.borrow() {
                    return false;
                }
            }
        }
    }
}
