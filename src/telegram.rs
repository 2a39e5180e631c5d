use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fmt;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::BotError;

/// Outbound message channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), BotError>;
}

pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat: Recipient) -> Self {
        Self { bot, chat }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let chat = parse_recipient(&cfg.telegram.chat_id).ok_or_else(|| {
            anyhow!(
                "telegram.chat_id must be a numeric chat id or an @channel name, got {:?}",
                cfg.telegram.chat_id
            )
        })?;
        let client = teloxide::net::default_reqwest_settings()
            .timeout(cfg.app.request_timeout())
            .build()
            .context("failed to build Telegram HTTP client")?;
        let bot = Bot::with_client(cfg.telegram.bot_token.clone(), client);
        Ok(Self::new(bot, chat))
    }
}

/// Numeric ids address users/groups, `@name` addresses public channels.
pub fn parse_recipient(raw: &str) -> Option<Recipient> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(Recipient::Id(ChatId(id)));
    }
    if raw.len() > 1 && raw.starts_with('@') {
        return Some(Recipient::ChannelUsername(raw.to_string()));
    }
    None
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all)]
    async fn send(&self, text: &str) -> Result<(), BotError> {
        info!("sending message to telegram");
        match self.bot.send_message(self.chat.clone(), text).await {
            Ok(_) => {
                debug!(%text, "message sent");
                Ok(())
            }
            Err(err) => {
                error!(?err, "telegram send failed");
                Err(BotError::NotificationSendFailure(err.to_string()))
            }
        }
    }
}
