// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram ingress adapter for the shiftlens capture service.
//!
//! Translates the three session commands and screenshot uploads into
//! repository calls via long polling, and provides the [`NotificationSender`]
//! implementation the delivery dispatcher injects. The adapter holds no
//! grouping state of its own; everything lives in the store.

pub mod commands;
pub mod handler;
pub mod media;

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use shiftlens_config::model::TelegramConfig;
use shiftlens_core::{NotificationSender, ScheduleNotification, ShiftlensError};

use crate::handler::IngressDeps;

/// Telegram ingress connected via long polling.
///
/// Filters messages to authorized DMs, extracts commands and uploads, and
/// always returns success to the transport so Telegram does not redeliver.
pub struct TelegramIngress {
    bot: Bot,
    config: TelegramConfig,
    deps: Arc<IngressDeps>,
}

impl TelegramIngress {
    /// Creates the ingress. Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig, deps: IngressDeps) -> Result<Self, ShiftlensError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ShiftlensError::Config("telegram.bot_token is required for the ingress".into())
        })?;
        if token.is_empty() {
            return Err(ShiftlensError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            bot: Bot::new(token),
            config,
            deps: Arc::new(deps),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Run long polling until the token is cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        let deps = self.deps.clone();
        let allowed_users: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());
        let handler_cancel = cancel.clone();

        info!("starting Telegram long polling");

        let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            let allowed = allowed_users.clone();
            let cancel = handler_cancel.clone();
            async move {
                if !is_dm(&msg) {
                    debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                    return respond(());
                }
                if !is_authorized(&msg, &allowed) {
                    debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                    return respond(());
                }
                let Some(user_id) = sender_user_id(&msg) else {
                    debug!(chat_id = msg.chat.id.0, "ignoring message without sender");
                    return respond(());
                };

                let reply = build_reply(&bot, &msg, &deps, &cancel, user_id).await;
                if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                    error!(chat_id = msg.chat.id.0, error = %e, "failed to send reply");
                }
                respond(())
            }
        });

        let mut dispatcher = Dispatcher::builder(self.bot, handler)
            .default_handler(|_| async {}) // Silently ignore non-message updates
            .build();

        tokio::select! {
            _ = dispatcher.dispatch() => {
                error!("Telegram long polling stopped unexpectedly");
            }
            _ = cancel.cancelled() => {
                info!("Telegram ingress shutting down");
            }
        }
    }
}

/// Route one authorized DM to the right handler and produce the reply.
async fn build_reply(
    bot: &Bot,
    msg: &Message,
    deps: &IngressDeps,
    cancel: &CancellationToken,
    user_id: i64,
) -> String {
    if let Some(text) = msg.text() {
        return match commands::parse_command(text) {
            Some(command) => handler::handle_command(deps, cancel, user_id, command).await,
            None => handler::USAGE_REPLY.to_string(),
        };
    }

    match media::extract_upload(bot, msg).await {
        Ok(Some(upload)) => {
            let external_message_id = Some(i64::from(msg.id.0));
            handler::handle_upload(
                deps,
                cancel,
                user_id,
                &upload.bytes,
                &upload.extension,
                external_message_id,
            )
            .await
        }
        Ok(None) => handler::INVALID_MEDIA_REPLY.to_string(),
        Err(e) => {
            error!(user_id, error = %e, "failed to extract upload");
            handler::GENERIC_FAILURE_REPLY.to_string()
        }
    }
}

/// Whether the message arrived over a direct chat. Group, supergroup, and
/// channel traffic is ignored wholesale.
pub fn is_dm(msg: &Message) -> bool {
    msg.chat.is_private()
}

/// Whether the sender appears on the allow-list.
///
/// Entries that parse as integers are user ids; anything else is treated as
/// a username, with or without the leading `@`. An empty list authorizes
/// nobody, and so does a message without a sender.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    let Some(sender) = msg.from.as_ref() else {
        return false;
    };

    allowed_users.iter().any(|entry| {
        let entry = entry.trim();
        if let Ok(id) = entry.parse::<u64>() {
            return sender.id.0 == id;
        }
        let name = entry.trim_start_matches('@');
        sender
            .username
            .as_deref()
            .is_some_and(|username| username.eq_ignore_ascii_case(name))
    })
}

/// The sender's user id as the signed integer the store keys on.
pub fn sender_user_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|u| u.id.0 as i64)
}

/// Delivers schedule notifications over the Telegram Bot API.
///
/// The notification's `user_id` doubles as the DM chat id.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, notification: &ScheduleNotification) -> Result<(), ShiftlensError> {
        self.bot
            .send_message(
                Recipient::Id(ChatId(notification.user_id)),
                &notification.message,
            )
            .await
            .map_err(|e| ShiftlensError::Channel {
                message: format!(
                    "failed to deliver notification {}: {e}",
                    notification.notification_id
                ),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock private chat message from JSON, matching the Telegram
    /// Bot API structure.
    fn make_private_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let from = if let Some(uname) = username {
            serde_json::json!({
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
                "username": uname,
            })
        } else {
            serde_json::json!({
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            })
        };

        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    /// Build a mock group chat message.
    fn make_group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    #[test]
    fn new_requires_bot_token() {
        let config = TelegramConfig {
            bot_token: None,
            allowed_users: vec![],
        };
        let deps = IngressDeps {
            db: None,
            blob: std::sync::Arc::new(NullBlob),
        };
        assert!(TelegramIngress::new(config, deps).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        let config = TelegramConfig {
            bot_token: Some(String::new()),
            allowed_users: vec![],
        };
        let deps = IngressDeps {
            db: None,
            blob: std::sync::Arc::new(NullBlob),
        };
        assert!(TelegramIngress::new(config, deps).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11".into()),
            allowed_users: vec!["42".into()],
        };
        let deps = IngressDeps {
            db: None,
            blob: std::sync::Arc::new(NullBlob),
        };
        assert!(TelegramIngress::new(config, deps).is_ok());
    }

    #[test]
    fn authorized_by_user_id() {
        let msg = make_private_message(12345, None, "hello");
        assert!(is_authorized(&msg, &["12345".into()]));
    }

    #[test]
    fn authorized_by_username_with_or_without_at() {
        let msg = make_private_message(12345, Some("TestUser"), "hello");
        assert!(is_authorized(&msg, &["testuser".into()]));
        assert!(is_authorized(&msg, &["@testuser".into()]));
    }

    #[test]
    fn not_authorized_on_empty_list_or_wrong_user() {
        let msg = make_private_message(12345, Some("testuser"), "hello");
        assert!(!is_authorized(&msg, &[]));
        assert!(!is_authorized(&msg, &["99999".into()]));
    }

    #[test]
    fn dm_detection() {
        assert!(is_dm(&make_private_message(12345, None, "hi")));
        assert!(!is_dm(&make_group_message(12345, "hi")));
    }

    #[test]
    fn sender_user_id_maps_to_i64() {
        let msg = make_private_message(12345, None, "hi");
        assert_eq!(sender_user_id(&msg), Some(12345));
    }

    /// Blob stub for constructor tests; never invoked.
    struct NullBlob;

    #[async_trait]
    impl shiftlens_core::ObjectStore for NullBlob {
        async fn put(&self, _bytes: &[u8], _extension: &str) -> Result<String, ShiftlensError> {
            Err(ShiftlensError::Internal("null blob".into()))
        }

        async fn get(&self, _key: &str) -> Result<Vec<u8>, ShiftlensError> {
            Err(ShiftlensError::Internal("null blob".into()))
        }
    }
}
