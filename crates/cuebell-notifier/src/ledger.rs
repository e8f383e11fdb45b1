use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::NotificationKey;

/// Keys that have already produced a queued notification, each with the end
/// of its item.
///
/// Recorded at enqueue time, never at delivery: a crash between the two
/// loses the notice rather than sending it twice.
#[derive(Debug, Default)]
pub struct DedupLedger {
    keys: HashMap<NotificationKey, DateTime<Utc>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.keys.contains_key(key)
    }

    /// Record `key` for an item ending at `ends_at`. Returns `false` if the
    /// key was already present, leaving the stored end untouched.
    pub fn record(&mut self, key: NotificationKey, ends_at: DateTime<Utc>) -> bool {
        if self.keys.contains_key(&key) {
            return false;
        }
        // an item never ends before it starts
        let ends_at = ends_at.max(key.scheduled_time);
        self.keys.insert(key, ends_at);
        true
    }

    /// Drop keys whose item ended before `cutoff`. Returns how many went.
    ///
    /// A live item keeps its key however old its start is, so it cannot be
    /// classified as un-notified again.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.keys.len();
        self.keys.retain(|_, ends_at| *ends_at >= cutoff);
        before - self.keys.len()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(offset_mins: i64) -> NotificationKey {
        NotificationKey {
            server_id: 1,
            channel_id: 2,
            scheduled_time: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
                + Duration::minutes(offset_mins),
        }
    }

    #[test]
    fn record_is_idempotent() {
        let mut ledger = DedupLedger::new();
        let k = key(0);
        assert!(ledger.record(k, k.scheduled_time));
        assert!(!ledger.record(k, k.scheduled_time));
        assert!(ledger.contains(&key(0)));
        assert!(!ledger.contains(&key(5)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn eviction_keeps_recent_keys() {
        let mut ledger = DedupLedger::new();
        for offset in [-120, -30, 60] {
            let k = key(offset);
            ledger.record(k, k.scheduled_time + Duration::minutes(10));
        }

        let evicted = ledger.evict_before(key(-60).scheduled_time);
        assert_eq!(evicted, 1);
        assert!(!ledger.contains(&key(-120)));
        assert!(ledger.contains(&key(-30)));
        assert!(ledger.contains(&key(60)));
    }

    #[test]
    fn long_item_outlives_its_start() {
        let mut ledger = DedupLedger::new();
        // four hour item that started two hours before the cutoff
        let k = key(-120);
        ledger.record(k, k.scheduled_time + Duration::hours(4));

        assert_eq!(ledger.evict_before(key(0).scheduled_time), 0);
        assert!(ledger.contains(&k));
        assert_eq!(ledger.evict_before(key(121).scheduled_time), 1);
    }
}
