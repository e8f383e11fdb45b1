use serde::{Deserialize, Serialize};

/// Partial update applied to every event with a given URL.
/// `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub url: Option<String>,
    pub notice_minutes: Option<u32>,
    pub server_id: Option<u64>,
    pub channel_id: Option<u64>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.notice_minutes.is_none()
            && self.server_id.is_none()
            && self.channel_id.is_none()
    }
}

/// Conjunctive filter; an empty filter matches every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub url: Option<String>,
    pub notice_minutes: Option<u32>,
    pub server_id: Option<u64>,
    pub channel_id: Option<u64>,
}
