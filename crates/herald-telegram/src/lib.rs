// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Herald broadcaster.
//!
//! Implements [`TransportAdapter`] over the Bot API via teloxide. Each
//! delivery is a single `sendMessage` or `sendPhoto` call in HTML parse mode;
//! failures are classified by [`classify`] and never surface as errors.

pub mod classify;
pub mod keyboard;

use async_trait::async_trait;
use herald_config::model::TelegramConfig;
use herald_core::error::HeraldError;
use herald_core::traits::{PluginAdapter, TransportAdapter};
use herald_core::types::{AdapterType, DeliveryOutcome, HealthStatus, Message};
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, ParseMode};
use tracing::debug;

/// Telegram transport implementing [`TransportAdapter`].
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Creates a new transport. Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, HeraldError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            HeraldError::Config("telegram.bot_token is required for delivery".into())
        })?;

        if token.trim().is_empty() {
            return Err(HeraldError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let mut bot = Bot::new(token);
        if let Some(api_url) = config.api_url.as_deref() {
            let url = reqwest::Url::parse(api_url).map_err(|e| {
                HeraldError::Config(format!("telegram.api_url `{api_url}` is invalid: {e}"))
            })?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    async fn send(&self, message: &Message) -> Result<(), teloxide::RequestError> {
        let chat = ChatId(message.recipient_id);
        let markup = message.buttons.as_ref().and_then(keyboard::inline_keyboard);

        match &message.image_ref {
            Some(file_id) => {
                let mut request = self
                    .bot
                    .send_photo(chat, InputFile::file_id(FileId(file_id.clone())))
                    .caption(message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await?;
            }
            None => {
                let mut request = self
                    .bot
                    .send_message(chat, message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        debug!("Telegram transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for TelegramTransport {
    async fn deliver(&self, message: &Message) -> DeliveryOutcome {
        match self.send(message).await {
            Ok(()) => DeliveryOutcome::Ok,
            Err(e) => {
                let outcome = classify::classify_error(&e);
                debug!(
                    recipient_id = message.recipient_id,
                    outcome = outcome.label(),
                    error = %e,
                    "delivery failed"
                );
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_rejected() {
        let err = TelegramTransport::new(&TelegramConfig::default())
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn blank_token_is_rejected() {
        let config = TelegramConfig {
            bot_token: Some("   ".into()),
            api_url: None,
        };
        assert!(TelegramTransport::new(&config).is_err());
    }

    #[test]
    fn bad_api_url_is_rejected() {
        let config = TelegramConfig {
            bot_token: Some("123:ABC".into()),
            api_url: Some("not a url".into()),
        };
        let err = TelegramTransport::new(&config).err().expect("should fail");
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn valid_config_builds_transport() {
        let config = TelegramConfig {
            bot_token: Some("123:ABC".into()),
            api_url: Some("http://127.0.0.1:8081".into()),
        };
        let transport = TelegramTransport::new(&config).unwrap();
        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.adapter_type(), AdapterType::Transport);
    }
}
