use thiserror::Error;

use cuebell_core::RegistryError;

/// Errors that abort a whole scan pass. Per-event and per-delivery failures
/// are logged and isolated, never surfaced here.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The event registry could not be listed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, NotifierError>;
