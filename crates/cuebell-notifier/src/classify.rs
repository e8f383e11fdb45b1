//! Item classification: decide whether, when and what to notify for each
//! schedule item, given the current time.
//!
//! All comparisons are done on absolute instants. Schedule times carry their
//! own UTC offset, so "now in the schedule's timezone" and "now in UTC" are
//! the same instant.

use chrono::{DateTime, Duration, Utc};

use cuebell_core::{MonitoredEvent, ScheduleDocument, ScheduleItem};

use crate::types::{Decision, NoticeKind, NotificationKey, SkipReason};

/// Two queued notices for the same item whose wake times differ by no more
/// than this are considered the same notice.
pub const DUPLICATE_TOLERANCE_SECS: i64 = 1;

/// Read access to the engine's dedup state, used by the classifier.
pub trait PendingView {
    /// The key already produced a notification.
    fn already_notified(&self, key: &NotificationKey) -> bool;

    /// An equivalent notification is waiting in the queue.
    fn has_pending(&self, key: &NotificationKey, wake_time: DateTime<Utc>) -> bool;
}

/// Inputs shared by every item of one document.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub now: DateTime<Utc>,
    pub event: &'a MonitoredEvent,
    pub doc: &'a ScheduleDocument,
    /// Items starting further out than this are left for a later scan.
    pub far_horizon: Duration,
}

impl ClassifyContext<'_> {
    fn notice(&self) -> Duration {
        Duration::minutes(i64::from(self.event.notice_minutes))
    }

    /// Start of the monitoring window: twice the notice lead before the
    /// document's overall start.
    pub fn monitor_start(&self) -> DateTime<Utc> {
        self.doc.start_time.with_timezone(&Utc) - self.notice() * 2
    }

    pub fn key_for(&self, scheduled: DateTime<Utc>) -> NotificationKey {
        NotificationKey {
            server_id: self.event.server_id,
            channel_id: self.event.channel_id,
            scheduled_time: scheduled,
        }
    }
}

/// Classify a single item.
pub fn classify_item(
    ctx: &ClassifyContext<'_>,
    item: &ScheduleItem,
    view: &impl PendingView,
) -> Decision {
    let now = ctx.now;

    if now < ctx.monitor_start() {
        return Decision::Skip(SkipReason::TooEarly);
    }

    let Some(scheduled) = item.scheduled_utc() else {
        return Decision::Skip(SkipReason::Unscheduled);
    };
    let key = ctx.key_for(scheduled);
    let ends = scheduled + Duration::seconds(item.length_seconds.max(0));

    if scheduled <= now && now < ends {
        if view.already_notified(&key) {
            return Decision::Skip(SkipReason::AlreadyNotified);
        }
        return Decision::NotifyNow(NoticeKind::AlreadyStarted {
            minutes_since: (now - scheduled).num_minutes(),
        });
    }

    if scheduled <= now {
        return Decision::Skip(SkipReason::Finished);
    }

    let until = scheduled - now;
    if until > ctx.far_horizon {
        return Decision::Skip(SkipReason::TooFarAhead);
    }

    let wake_time = scheduled - ctx.notice();
    if wake_time < now {
        return Decision::NotifyNow(NoticeKind::StartingSoon {
            minutes_until: ceil_minutes(until),
            minutes_late: (now - wake_time).num_minutes(),
        });
    }

    if view.has_pending(&key, wake_time) {
        return Decision::Skip(SkipReason::DuplicatePending);
    }

    Decision::NotifyAt {
        wake_time,
        kind: NoticeKind::Advance {
            minutes_until: i64::from(ctx.event.notice_minutes),
        },
    }
}

/// Classify the items of `ctx.doc` in order, stopping after the first
/// decision that rules out the rest of the document.
///
/// Returns `(item index, decision)` pairs for every item evaluated.
pub fn classify_document(
    ctx: &ClassifyContext<'_>,
    view: &impl PendingView,
) -> Vec<(usize, Decision)> {
    let mut out = Vec::new();
    for (i, item) in ctx.doc.items.iter().enumerate() {
        let decision = classify_item(ctx, item, view);
        out.push((i, decision));
        if let Decision::Skip(reason) = decision {
            if reason.halts_document() {
                break;
            }
        }
    }
    out
}

fn ceil_minutes(d: Duration) -> i64 {
    (d.num_seconds() + 59).div_euclid(60)
}
