use thiserror::Error;

#[derive(Debug, Error)]
pub enum CuebellError {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CuebellError>;

/// Errors surfaced by an [`EventRegistry`](crate::traits::EventRegistry) backend.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The backing store could not be read or written.
    #[error("Registry backend error: {0}")]
    Backend(String),

    /// No monitored event matched the given URL.
    #[error("Event not found: {url}")]
    NotFound { url: String },
}

/// Errors surfaced by a [`ScheduleSource`](crate::traits::ScheduleSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote host answered 404 for the schedule document.
    #[error("Schedule not found: {url}")]
    NotFound { url: String },

    /// Transport failure or a non-404 HTTP error status.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The document was fetched but is not a usable schedule.
    #[error("Malformed schedule {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The local cache could not be read or written.
    #[error("Schedule cache error: {0}")]
    Cache(String),
}

/// Errors surfaced by a [`NotificationSink`](crate::traits::NotificationSink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// The server or channel no longer exists (or the bot cannot see it).
    #[error("Destination missing ({server_id}/{channel_id}): {reason}")]
    DestinationMissing {
        server_id: u64,
        channel_id: u64,
        reason: String,
    },

    /// The channel exists but cannot carry a text message.
    #[error("Channel {channel_id} does not accept messages (kind: {kind})")]
    Unsupported { channel_id: u64, kind: String },

    /// Any other delivery failure.
    #[error("Transport error: {0}")]
    Transport(String),
}
