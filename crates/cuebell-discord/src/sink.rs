use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType};
use serenity::model::id::ChannelId;
use tracing::debug;

use cuebell_core::{NotificationDetail, NotificationSink, SinkError};

use crate::embed::NoticeEmbed;
use crate::send::send_chunked;

/// Upper bound on one delivery, lookup included.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers notifications through Discord's REST API.
///
/// Only needs an `Http` client, so it keeps working while the gateway
/// reconnects.
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn deliver(
        &self,
        server_id: u64,
        channel_id: u64,
        message: &str,
        detail: &NotificationDetail,
    ) -> Result<(), SinkError> {
        if server_id == 0 || channel_id == 0 {
            return Err(missing(server_id, channel_id, "zero id"));
        }
        let channel = ChannelId::new(channel_id);

        let resolved = channel
            .to_channel(&self.http)
            .await
            .map_err(|e| map_error(server_id, channel_id, e))?;
        let (guild, kind) = match &resolved {
            Channel::Guild(gc) => (Some(gc.guild_id.get()), Some(gc.kind)),
            _ => (None, None),
        };
        check_destination(server_id, channel_id, guild, kind)?;

        let embed = NoticeEmbed::from_detail(detail).to_create_embed();
        send_chunked(&self.http, channel, message, Some(embed))
            .await
            .map_err(|e| map_error(server_id, channel_id, e))?;

        debug!(server_id, channel_id, "discord: message sent");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn send(
        &self,
        server_id: u64,
        channel_id: u64,
        message: &str,
        detail: &NotificationDetail,
    ) -> Result<(), SinkError> {
        debug!(server_id, channel_id, "discord: delivering notification");
        tokio::time::timeout(SEND_TIMEOUT, self.deliver(server_id, channel_id, message, detail))
            .await
            .unwrap_or_else(|_| Err(SinkError::Transport("discord request timed out".to_string())))
    }
}

/// Validate a resolved channel against the destination it was registered for.
///
/// `guild` and `kind` are `None` for channels outside any guild (DMs).
fn check_destination(
    server_id: u64,
    channel_id: u64,
    guild: Option<u64>,
    kind: Option<ChannelType>,
) -> Result<(), SinkError> {
    let Some(kind) = kind else {
        return Err(SinkError::Unsupported {
            channel_id,
            kind: "private".to_string(),
        });
    };
    if guild != Some(server_id) {
        return Err(missing(server_id, channel_id, "channel is not in this server"));
    }
    match kind {
        ChannelType::Text | ChannelType::Voice | ChannelType::News => Ok(()),
        other => Err(SinkError::Unsupported {
            channel_id,
            kind: other.name().to_string(),
        }),
    }
}

fn map_error(server_id: u64, channel_id: u64, e: serenity::Error) -> SinkError {
    if is_not_found(&e) {
        missing(server_id, channel_id, "unknown channel")
    } else {
        SinkError::Transport(e.to_string())
    }
}

fn is_not_found(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Http(http_err)
            if http_err.status_code().map(|s| s.as_u16()) == Some(404)
    )
}

fn missing(server_id: u64, channel_id: u64, reason: &str) -> SinkError {
    SinkError::DestinationMissing {
        server_id,
        channel_id,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_voice_and_news_channels_are_accepted() {
        for kind in [ChannelType::Text, ChannelType::Voice, ChannelType::News] {
            assert!(check_destination(1, 2, Some(1), Some(kind)).is_ok());
        }
    }

    #[test]
    fn channel_in_another_server_is_missing() {
        let err = check_destination(1, 2, Some(99), Some(ChannelType::Text)).unwrap_err();
        assert!(matches!(
            err,
            SinkError::DestinationMissing { server_id: 1, channel_id: 2, .. }
        ));
    }

    #[test]
    fn other_kinds_are_unsupported() {
        let err = check_destination(1, 2, Some(1), Some(ChannelType::Category)).unwrap_err();
        assert!(matches!(err, SinkError::Unsupported { channel_id: 2, .. }));

        let dm = check_destination(1, 2, None, None).unwrap_err();
        assert!(matches!(dm, SinkError::Unsupported { .. }));
    }

    #[test]
    fn non_http_errors_are_transport() {
        let err = map_error(1, 2, serenity::Error::Other("boom"));
        assert!(matches!(err, SinkError::Transport(_)));
    }
}
