use async_trait::async_trait;

use crate::{
    error::{RegistryError, SinkError, SourceError},
    types::{MonitoredEvent, NotificationDetail, ScheduleDocument},
};

/// Durable store of monitored events.
///
/// The notifier only needs a snapshot per scan; CRUD lives on the concrete
/// store (see `cuebell-events`).
#[async_trait]
pub trait EventRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<MonitoredEvent>, RegistryError>;
}

/// Provider of schedule documents, with its own fetch and cache policy.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Return the current schedule for `url`.
    async fn get(&self, url: &str) -> Result<ScheduleDocument, SourceError>;
}

/// Delivers a rendered notification to a `(server, channel)` destination.
///
/// Implementations bound their own call time; the dispatch loop awaits each
/// send before looking at the next entry.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        server_id: u64,
        channel_id: u64,
        message: &str,
        detail: &NotificationDetail,
    ) -> Result<(), SinkError>;
}
