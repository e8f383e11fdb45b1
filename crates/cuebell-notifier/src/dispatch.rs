//! Dispatch loop: drains the pending queue in wake-time order.
//!
//! The loop peeks before committing to a wait and the wait is raced against
//! the engine's wake signal, so an entry queued mid-wait with an earlier wake
//! time is delivered on time instead of behind the one being waited on.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use cuebell_core::SinkError;

use crate::{engine::Notifier, types::PendingNotification};

/// What the dispatch loop should do next.
#[derive(Debug)]
pub(crate) enum DispatchStep {
    /// Queue is empty.
    Idle,
    /// Earliest entry is not due until this instant.
    WaitUntil(DateTime<Utc>),
    /// Earliest entry is due and has been removed from the queue.
    Due(PendingNotification),
}

/// Terminal states of a delivery attempt. Nothing goes back to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DeliveryFailed(String),
}

impl Notifier {
    /// Peek and, if due, pop the earliest entry in one critical section.
    pub(crate) fn next_step(&self, now: DateTime<Utc>) -> DispatchStep {
        let mut state = self.lock_state();
        match state.queue.peek_min().map(|e| e.wake_time) {
            None => DispatchStep::Idle,
            Some(wake_time) if wake_time > now => DispatchStep::WaitUntil(wake_time),
            Some(_) => state
                .queue
                .pop_min()
                .map(DispatchStep::Due)
                .unwrap_or(DispatchStep::Idle),
        }
    }

    /// Hand one entry to the sink. Failures are logged and the entry dropped.
    pub async fn deliver(&self, entry: PendingNotification) -> DeliveryOutcome {
        let result = self
            .sink
            .send(
                entry.server_id,
                entry.channel_id,
                &entry.message,
                &entry.detail,
            )
            .await;

        match result {
            Ok(()) => {
                info!(
                    server_id = entry.server_id,
                    channel_id = entry.channel_id,
                    wake_time = %entry.wake_time,
                    "notification delivered"
                );
                DeliveryOutcome::Delivered
            }
            Err(e @ SinkError::DestinationMissing { .. }) => {
                warn!(
                    server_id = entry.server_id,
                    channel_id = entry.channel_id,
                    error = %e,
                    "destination missing, notification dropped"
                );
                DeliveryOutcome::DeliveryFailed(e.to_string())
            }
            Err(e) => {
                warn!(
                    server_id = entry.server_id,
                    channel_id = entry.channel_id,
                    error = %e,
                    "delivery failed, notification dropped"
                );
                DeliveryOutcome::DeliveryFailed(e.to_string())
            }
        }
    }

    /// Deliver queued notifications at their wake times until `shutdown`
    /// broadcasts `true`. Entries still queued at that point are lost.
    pub async fn run_dispatch_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("dispatch loop started");

        loop {
            let now = self.clock.now();
            let wait = match self.next_step(now) {
                DispatchStep::Due(entry) => {
                    self.deliver(entry).await;
                    continue;
                }
                DispatchStep::WaitUntil(wake_time) => {
                    (wake_time - now).to_std().unwrap_or(StdDuration::ZERO)
                }
                DispatchStep::Idle => self.settings.idle_poll,
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.wake.notified() => {}
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        let lost = self.queue_len();
                        info!(lost, "dispatch loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Spawn [`run_dispatch_loop`](Self::run_dispatch_loop) on the current runtime.
    pub fn start_dispatch_loop(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run_dispatch_loop(shutdown))
    }
}
