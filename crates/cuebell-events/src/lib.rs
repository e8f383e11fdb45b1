//! `cuebell-events`: SQLite-backed registry of monitored events.
//!
//! Each row pairs a schedule URL with a notice lead time and a Discord
//! destination. The same URL may be monitored by several channels; the
//! `(url, server_id, channel_id)` triple is unique.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{EventsError, Result};
pub use store::EventStore;
pub use types::{EventFilter, EventUpdate};
