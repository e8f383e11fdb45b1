//! Discord delivery for cuebell: a REST-backed [`NotificationSink`] plus a
//! gateway adapter that keeps the bot online.
//!
//! [`NotificationSink`]: cuebell_core::NotificationSink

pub mod adapter;
pub mod embed;
pub mod error;
pub mod send;
pub mod sink;

pub use adapter::DiscordAdapter;
pub use error::DiscordError;
pub use sink::DiscordSink;
