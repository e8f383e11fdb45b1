use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cuebell_core::config::NotifierConfig;
use cuebell_core::{
    EventRegistry, Locale, MonitoredEvent, NotificationDetail, NotificationSink,
    ScheduleDocument, ScheduleSource,
};

use crate::{
    classify::{classify_document, ClassifyContext, PendingView, DUPLICATE_TOLERANCE_SECS},
    error::Result,
    ledger::DedupLedger,
    message::render_message,
    queue::PendingQueue,
    types::{Decision, NotificationKey, PendingNotification, ScanReport},
};

/// Source of wall-clock time for the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Timing knobs for the two loops.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Period of the scan loop, also used as the far horizon.
    pub scan_interval: StdDuration,
    /// Dispatch wait while the queue is empty.
    pub idle_poll: StdDuration,
    /// Evict ledger keys older than this. `None` keeps them forever.
    pub ledger_retention: Option<Duration>,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self::from(&NotifierConfig::default())
    }
}

impl From<&NotifierConfig> for NotifierSettings {
    fn from(cfg: &NotifierConfig) -> Self {
        Self {
            scan_interval: StdDuration::from_secs(cfg.scan_interval_hours.max(1) * 3600),
            idle_poll: StdDuration::from_secs(cfg.idle_poll_secs.max(1)),
            ledger_retention: retention(cfg.ledger_retention_hours),
        }
    }
}

/// `0` disables retention; so does a value chrono cannot represent.
fn retention(hours: u64) -> Option<Duration> {
    if hours == 0 {
        return None;
    }
    let retention = i64::try_from(hours).ok().and_then(Duration::try_hours);
    if retention.is_none() {
        warn!(hours, "ledger retention out of range, keeping every key");
    }
    retention
}

/// Queue and ledger, always mutated together under one lock.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) queue: PendingQueue,
    pub(crate) ledger: DedupLedger,
}

impl PendingView for SharedState {
    fn already_notified(&self, key: &NotificationKey) -> bool {
        self.ledger.contains(key)
    }

    fn has_pending(&self, key: &NotificationKey, wake_time: DateTime<Utc>) -> bool {
        self.queue
            .contains_duplicate(key, wake_time, Duration::seconds(DUPLICATE_TOLERANCE_SECS))
    }
}

/// Schedule-monitoring and notification-dispatch engine.
///
/// One instance is shared (via `Arc`) by the scan loop and the dispatch loop.
/// The pending queue and dedup ledger are the only mutable state and live
/// behind a single mutex; `wake` interrupts the dispatch loop's wait whenever
/// a new entry is queued.
pub struct Notifier {
    registry: Arc<dyn EventRegistry>,
    source: Arc<dyn ScheduleSource>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    locale: Locale,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: NotifierSettings,
    state: Mutex<SharedState>,
    pub(crate) wake: Notify,
}

impl Notifier {
    pub fn new(
        registry: Arc<dyn EventRegistry>,
        source: Arc<dyn ScheduleSource>,
        sink: Arc<dyn NotificationSink>,
        locale: Locale,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            registry,
            source,
            sink,
            locale,
            clock: Arc::new(SystemClock),
            settings,
            state: Mutex::new(SharedState::default()),
            wake: Notify::new(),
        }
    }

    /// Replace the clock (virtual time in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &NotifierSettings {
        &self.settings
    }

    pub fn queue_len(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn ledger_len(&self) -> usize {
        self.lock_state().ledger.len()
    }

    /// Queue `entry` and record its key. Returns `false` when the key was
    /// already recorded, in which case nothing changes.
    ///
    /// The entry carries no item length, so its key is kept until retention
    /// passes its event time.
    pub fn enqueue(&self, entry: PendingNotification) -> bool {
        let key = entry.key();
        let ends_at = entry.event_time;
        let queued = {
            let mut state = self.lock_state();
            if state.ledger.contains(&key) {
                false
            } else if state.queue.push(entry) {
                state.ledger.record(key, ends_at);
                true
            } else {
                false
            }
        };
        if queued {
            self.wake.notify_one();
        }
        queued
    }

    /// One full pass over every monitored event.
    ///
    /// A schedule that cannot be fetched skips that event only. Fails only
    /// when the registry itself cannot be listed.
    pub async fn scan_once(&self) -> Result<ScanReport> {
        let cutoff = self
            .settings
            .ledger_retention
            .and_then(|retention| self.clock.now().checked_sub_signed(retention));
        if let Some(cutoff) = cutoff {
            let evicted = self.lock_state().ledger.evict_before(cutoff);
            if evicted > 0 {
                debug!(evicted, %cutoff, "evicted expired dedup keys");
            }
        }

        let events = self.registry.list().await?;
        let mut report = ScanReport {
            events_seen: events.len(),
            ..ScanReport::default()
        };

        for event in &events {
            let doc = match self.source.get(&event.url).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(url = %event.url, error = %e, "schedule unavailable, skipping event");
                    report.events_failed += 1;
                    continue;
                }
            };

            // fetching can take a while; classify against a fresh reading
            let now = self.clock.now();
            let (enqueued, skipped) = self.enqueue_document(now, event, &doc);
            report.enqueued += enqueued;
            report.skipped += skipped;

            // wake dispatch now; later fetches may take a while
            if enqueued > 0 {
                self.wake.notify_one();
            }
        }

        info!(
            events = report.events_seen,
            failed = report.events_failed,
            enqueued = report.enqueued,
            skipped = report.skipped,
            "scan complete"
        );
        Ok(report)
    }

    /// Classify one document and queue its notify decisions. Holds the state
    /// lock for the whole document so classification sees a consistent view.
    fn enqueue_document(
        &self,
        now: DateTime<Utc>,
        event: &MonitoredEvent,
        doc: &ScheduleDocument,
    ) -> (usize, usize) {
        let ctx = ClassifyContext {
            now,
            event,
            doc,
            far_horizon: Duration::from_std(self.settings.scan_interval)
                .unwrap_or_else(|_| Duration::hours(6)),
        };

        let mut enqueued = 0;
        let mut skipped = 0;
        let mut state = self.lock_state();

        for (idx, decision) in classify_document(&ctx, &*state) {
            let item = &doc.items[idx];
            let (wake_time, kind) = match decision {
                Decision::Skip(reason) => {
                    debug!(url = %event.url, item = idx, %reason, "item skipped");
                    skipped += 1;
                    continue;
                }
                Decision::NotifyNow(kind) => (now, kind),
                Decision::NotifyAt { wake_time, kind } => (wake_time, kind),
            };

            let (Some(scheduled), Some(detail)) =
                (item.scheduled_utc(), NotificationDetail::for_item(doc, item))
            else {
                skipped += 1;
                continue;
            };

            let key = ctx.key_for(scheduled);
            if state.ledger.contains(&key) {
                debug!(url = %event.url, item = idx, "item already notified");
                skipped += 1;
                continue;
            }

            let entry = PendingNotification {
                wake_time,
                server_id: event.server_id,
                channel_id: event.channel_id,
                message: render_message(&self.locale, doc, item, kind),
                detail,
                event_time: scheduled,
            };

            if state.queue.push(entry) {
                let ends_at = scheduled + Duration::seconds(item.length_seconds.max(0));
                state.ledger.record(key, ends_at);
                enqueued += 1;
                info!(
                    url = %event.url,
                    server_id = event.server_id,
                    channel_id = event.channel_id,
                    %wake_time,
                    ?kind,
                    "notification queued"
                );
            } else {
                skipped += 1;
            }
        }

        (enqueued, skipped)
    }

    /// Scan every `scan_interval` until `shutdown` broadcasts `true`.
    /// The first scan runs immediately.
    pub async fn run_scan_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.scan_interval.as_secs(),
            "scan loop started"
        );

        let mut interval = tokio::time::interval(self.settings.scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.scan_once().await {
                        error!("scan failed: {e}");
                    }
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        info!("scan loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Spawn [`run_scan_loop`](Self::run_scan_loop) on the current runtime.
    pub fn start_scan_loop(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_scan_loop(shutdown))
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SharedState> {
        // state is never left half-updated, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
