use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cuebell_core::NotificationDetail;

/// Identity of a notifiable occurrence. Two notifications with the same key
/// are never both delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub server_id: u64,
    pub channel_id: u64,
    pub scheduled_time: DateTime<Utc>,
}

/// A rendered notification waiting for its wake time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingNotification {
    /// When the notification should be delivered.
    pub wake_time: DateTime<Utc>,
    pub server_id: u64,
    pub channel_id: u64,
    /// Rendered message text.
    pub message: String,
    /// Structured payload rendered by the sink; carries the schedule's timezone.
    pub detail: NotificationDetail,
    /// Start of the schedule item this notification is about.
    pub event_time: DateTime<Utc>,
}

impl PendingNotification {
    pub fn key(&self) -> NotificationKey {
        NotificationKey {
            server_id: self.server_id,
            channel_id: self.channel_id,
            scheduled_time: self.event_time,
        }
    }
}

/// Which message a notify decision asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeKind {
    /// Regular notice, sent exactly `notice_minutes` before the start.
    Advance { minutes_until: i64 },
    /// The scan found the item already inside its notice window.
    StartingSoon { minutes_until: i64, minutes_late: i64 },
    /// The item is live right now.
    AlreadyStarted { minutes_since: i64 },
}

impl NoticeKind {
    /// Template key used to render this notice.
    pub fn template_key(&self) -> &'static str {
        match self {
            NoticeKind::Advance { .. } => "notice.advance",
            NoticeKind::StartingSoon { .. } => "notice.starting_soon",
            NoticeKind::AlreadyStarted { .. } => "notice.already_started",
        }
    }
}

/// Why an item produced no notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The document's monitoring window has not opened yet.
    TooEarly,
    /// The item has no start time.
    Unscheduled,
    /// Live item whose key is already in the ledger.
    AlreadyNotified,
    /// The item ended before `now`.
    Finished,
    /// The item starts beyond the far horizon.
    TooFarAhead,
    /// An equivalent entry is already waiting in the queue.
    DuplicatePending,
}

impl SkipReason {
    /// True when no later item of the same document should be evaluated.
    pub fn halts_document(self) -> bool {
        matches!(
            self,
            SkipReason::TooEarly | SkipReason::Unscheduled | SkipReason::TooFarAhead
        )
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::TooEarly => "too early",
            SkipReason::Unscheduled => "unscheduled",
            SkipReason::AlreadyNotified => "already notified",
            SkipReason::Finished => "finished",
            SkipReason::TooFarAhead => "too far ahead",
            SkipReason::DuplicatePending => "duplicate pending",
        };
        write!(f, "{s}")
    }
}

/// Outcome of classifying one schedule item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    NotifyNow(NoticeKind),
    NotifyAt {
        wake_time: DateTime<Utc>,
        kind: NoticeKind,
    },
}

/// Counters returned by one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Events listed by the registry.
    pub events_seen: usize,
    /// Events whose schedule could not be obtained.
    pub events_failed: usize,
    /// Notifications pushed onto the queue.
    pub enqueued: usize,
    /// Items that produced no notification.
    pub skipped: usize,
}
