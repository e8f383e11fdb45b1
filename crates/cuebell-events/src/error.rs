use thiserror::Error;

use cuebell_core::RegistryError;

/// Errors that can occur within the event registry.
#[derive(Debug, Error)]
pub enum EventsError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No event matched the given URL.
    #[error("Event not found: {url}")]
    NotFound { url: String },

    /// The destination already monitors this URL.
    #[error("Event already registered: {url} -> {server_id}/{channel_id}")]
    Duplicate {
        url: String,
        server_id: u64,
        channel_id: u64,
    },

    /// The event definition is unusable (e.g. empty URL).
    #[error("Invalid event: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EventsError>;

impl From<EventsError> for RegistryError {
    fn from(e: EventsError) -> Self {
        match e {
            EventsError::NotFound { url } => RegistryError::NotFound { url },
            other => RegistryError::Backend(other.to_string()),
        }
    }
}
