//! `cuebell-core`: shared data model, collaborator traits and configuration.
//!
//! The notifier engine only ever talks to the outside world through the three
//! traits in [`traits`]: an [`EventRegistry`] listing monitored events, a
//! [`ScheduleSource`] returning schedule documents, and a
//! [`NotificationSink`] delivering rendered messages.

pub mod config;
pub mod error;
pub mod locale;
pub mod traits;
pub mod types;

pub use error::{CuebellError, RegistryError, Result, SinkError, SourceError};
pub use locale::Locale;
pub use traits::{EventRegistry, NotificationSink, ScheduleSource};
pub use types::{MonitoredEvent, NotificationDetail, ScheduleDocument, ScheduleItem};
