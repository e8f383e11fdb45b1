use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::http::Http;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::prelude::{Context, EventHandler};
use serenity::Client;
use tokio::sync::watch;
use tracing::{error, info, warn};

use cuebell_core::config::DiscordConfig;

use crate::error::DiscordError;

/// Gateway handler. Notifications go out over REST, so it only reports readiness.
struct ReadyLogger;

#[async_trait]
impl EventHandler for ReadyLogger {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");
    }
}

/// Keeps a gateway session open so the bot shows as online, reconnecting
/// whenever it drops.
pub struct DiscordAdapter {
    token: String,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig) -> Result<Self, DiscordError> {
        let token = config
            .bot_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(DiscordError::NoToken)?;
        Ok(Self { token })
    }

    /// REST client for the same token, for building a [`DiscordSink`](crate::DiscordSink).
    pub fn http(&self) -> Arc<Http> {
        Arc::new(Http::new(&self.token))
    }

    /// Connect and keep reconnecting until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let intents = GatewayIntents::GUILDS;

        loop {
            let mut client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                            _ = shutdown.changed() => {
                                info!("Discord adapter shutting down");
                                return;
                            }
                        }
                    }
                }
            };

            info!("Discord: gateway connecting");
            tokio::select! {
                res = client.start() => match res {
                    Err(e) => warn!("Discord: gateway error ({e}), reconnecting in 5s"),
                    Ok(()) => info!("Discord: gateway stopped cleanly, reconnecting in 5s"),
                },
                _ = shutdown.changed() => {
                    client.shard_manager.shutdown_all().await;
                    info!("Discord adapter shutting down");
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                _ = shutdown.changed() => {
                    info!("Discord adapter shutting down");
                    return;
                }
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        Client::builder(&self.token, intents)
            .event_handler(ReadyLogger)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_token_is_rejected() {
        let none = DiscordConfig { bot_token: None };
        assert!(matches!(DiscordAdapter::new(&none), Err(DiscordError::NoToken)));

        let blank = DiscordConfig {
            bot_token: Some("  ".to_string()),
        };
        assert!(matches!(DiscordAdapter::new(&blank), Err(DiscordError::NoToken)));
    }
}
