//! `cuebell-notifier`: schedule-monitoring and notification-dispatch engine.
//!
//! # Overview
//!
//! Two loops share one [`Notifier`]:
//!
//! - the **scan loop** wakes every `scan_interval`, lists monitored events,
//!   fetches each schedule, classifies every item against the current time and
//!   queues the resulting notifications;
//! - the **dispatch loop** waits for the earliest queued notification to fall
//!   due and hands it to the sink, one at a time, in wake-time order.
//!
//! # Classification
//!
//! | Condition                                         | Decision                |
//! |---------------------------------------------------|-------------------------|
//! | `now < start − 2×notice`                          | skip, stop document     |
//! | item has no start time                            | skip, stop document     |
//! | item is live and not yet notified                 | notify now              |
//! | item already ended                                | skip                    |
//! | item starts beyond the far horizon                | skip, stop document     |
//! | notice moment already passed                      | notify now (late)       |
//! | equivalent entry already queued                   | skip                    |
//! | otherwise                                         | notify at start − notice |
//!
//! Every queued notification records its `(server, channel, start)` key in the
//! dedup ledger at enqueue time, so a key is never delivered twice.

pub mod classify;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod message;
pub mod queue;
pub mod types;


pub use dispatch::DeliveryOutcome;
pub use engine::{Clock, Notifier, NotifierSettings, SystemClock};
pub use error::{NotifierError, Result};
pub use types::{
    Decision, NoticeKind, NotificationKey, PendingNotification, ScanReport, SkipReason,
};
