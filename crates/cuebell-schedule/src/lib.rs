//! `cuebell-schedule`: fetches Horaro-style schedule documents over HTTP and
//! keeps an on-disk copy of each one.
//!
//! [`HttpScheduleSource`] implements [`cuebell_core::ScheduleSource`] for the
//! notifier: fresh cache hits are served from disk, misses and expired entries
//! are refetched, and a stale copy is served when the host cannot be reached.

pub mod cache;
pub mod horaro;
pub mod source;

pub use cache::{CachedPayload, ScheduleCache};
pub use horaro::parse_document;
pub use source::HttpScheduleSource;
