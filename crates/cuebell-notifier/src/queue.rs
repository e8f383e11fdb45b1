use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Duration, Utc};

use crate::types::{NotificationKey, PendingNotification};

/// Heap slot. Ordering is reversed so `BinaryHeap` (a max-heap) pops the
/// earliest wake time first; `seq` breaks ties in insertion order.
#[derive(Debug)]
struct Slot {
    seq: u64,
    entry: PendingNotification,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .entry
            .wake_time
            .cmp(&self.entry.wake_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered collection of notifications awaiting delivery.
///
/// Not synchronised on its own; the engine keeps it behind the same lock as
/// the dedup ledger.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: BinaryHeap<Slot>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`. Refused (returns `false`) when an entry with the same
    /// key is already queued.
    pub fn push(&mut self, entry: PendingNotification) -> bool {
        let key = entry.key();
        if self.heap.iter().any(|s| s.entry.key() == key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Slot { seq, entry });
        true
    }

    pub fn peek_min(&self) -> Option<&PendingNotification> {
        self.heap.peek().map(|s| &s.entry)
    }

    pub fn pop_min(&mut self) -> Option<PendingNotification> {
        self.heap.pop().map(|s| s.entry)
    }

    /// Is an equivalent notification already waiting? Same destination and
    /// event time, wake time within `tolerance`.
    pub fn contains_duplicate(
        &self,
        key: &NotificationKey,
        wake_time: DateTime<Utc>,
        tolerance: Duration,
    ) -> bool {
        self.heap.iter().any(|s| {
            let e = &s.entry;
            let drift = e.wake_time - wake_time;
            e.server_id == key.server_id
                && e.channel_id == key.channel_id
                && e.event_time == key.scheduled_time
                && drift <= tolerance
                && drift >= -tolerance
        })
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebell_core::NotificationDetail;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(channel_id: u64, wake_mins: i64, message: &str) -> PendingNotification {
        let event_time = base() + Duration::minutes(wake_mins + 10);
        PendingNotification {
            wake_time: base() + Duration::minutes(wake_mins),
            server_id: 1,
            channel_id,
            message: message.to_string(),
            detail: NotificationDetail {
                schedule_name: "Marathon".to_string(),
                title: None,
                fields: vec![],
                event_time: event_time.fixed_offset(),
                timezone: "UTC".to_string(),
            },
            event_time,
        }
    }

    #[test]
    fn pops_in_wake_order() {
        let mut q = PendingQueue::new();
        q.push(entry(1, 30, "c"));
        q.push(entry(2, 10, "a"));
        q.push(entry(3, 20, "b"));

        assert_eq!(q.peek_min().map(|e| e.message.as_str()), Some("a"));
        let order: Vec<String> = std::iter::from_fn(|| q.pop_min())
            .map(|e| e.message)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut q = PendingQueue::new();
        q.push(entry(1, 10, "first"));
        q.push(entry(2, 10, "second"));
        q.push(entry(3, 10, "third"));

        assert_eq!(q.pop_min().unwrap().message, "first");
        assert_eq!(q.pop_min().unwrap().message, "second");
        assert_eq!(q.pop_min().unwrap().message, "third");
    }

    #[test]
    fn same_key_is_refused() {
        let mut q = PendingQueue::new();
        assert!(q.push(entry(1, 10, "a")));
        assert!(!q.push(entry(1, 10, "a again")));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn duplicate_check_honours_tolerance() {
        let mut q = PendingQueue::new();
        let e = entry(1, 10, "a");
        let key = e.key();
        let wake = e.wake_time;
        q.push(e);

        assert!(q.contains_duplicate(&key, wake + Duration::milliseconds(900), Duration::seconds(1)));
        assert!(!q.contains_duplicate(&key, wake + Duration::seconds(5), Duration::seconds(1)));

        let other_channel = NotificationKey {
            channel_id: 99,
            ..key
        };
        assert!(!q.contains_duplicate(&other_channel, wake, Duration::seconds(1)));
    }
}
