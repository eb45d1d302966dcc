// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram adapter for the MtcACG harvester.
//!
//! [`TelegramTarget`] implements [`DeliveryTarget`] for the destination
//! channel. [`run_dispatcher`] long-polls the Bot API and routes private
//! messages and button presses into the [`SessionMachine`].

pub mod handler;

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use mtcacg_config::model::TelegramConfig;
use mtcacg_core::{
    AdapterType, DeliveryTarget, FileReference, HealthStatus, MtcError, PhotoInput, PluginAdapter,
    SentPhoto,
};
use mtcacg_session::SessionMachine;

/// Builds a bot client from `telegram.bot_token`.
pub fn bot_from_config(config: &TelegramConfig) -> Result<Bot, MtcError> {
    let token = config
        .bot_token
        .as_deref()
        .ok_or_else(|| MtcError::Config("telegram.bot_token is required".into()))?;
    if token.is_empty() {
        return Err(MtcError::Config("telegram.bot_token cannot be empty".into()));
    }
    Ok(Bot::new(token))
}

/// The destination channel.
pub struct TelegramTarget {
    bot: Bot,
    channel: ChatId,
    max_payload_bytes: usize,
}

impl TelegramTarget {
    /// Creates a target for `telegram.channel_id`.
    pub fn new(bot: Bot, config: &TelegramConfig) -> Result<Self, MtcError> {
        let channel = config
            .channel_id
            .ok_or_else(|| MtcError::Config("telegram.channel_id is required".into()))?;
        Ok(Self {
            bot,
            channel: ChatId(channel),
            max_payload_bytes: config.max_photo_bytes,
        })
    }
}

#[async_trait]
impl PluginAdapter for TelegramTarget {
    fn name(&self) -> &str {
        "telegram"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl DeliveryTarget for TelegramTarget {
    fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    async fn send_photo(&self, photo: PhotoInput, caption: &str) -> Result<SentPhoto, MtcError> {
        let input = match photo {
            PhotoInput::Upload { bytes, file_name } => {
                debug!(size = bytes.len(), file_name = file_name.as_str(), "uploading photo");
                InputFile::memory(bytes).file_name(file_name)
            }
            PhotoInput::Existing(reference) => InputFile::file_id(FileId(reference.0)),
        };

        let sent = self
            .bot
            .send_photo(self.channel, input)
            .caption(caption)
            .await
            .map_err(|e| MtcError::Delivery {
                message: format!("failed to send photo: {e}"),
                source: Some(Box::new(e)),
            })?;

        // Telegram lists the stored sizes smallest first.
        let largest = sent
            .photo()
            .and_then(|sizes| sizes.last())
            .ok_or_else(|| MtcError::Delivery {
                message: format!("message {} carries no photo", sent.id.0),
                source: None,
            })?;

        Ok(SentPhoto {
            file_reference: FileReference(largest.file.id.to_string()),
            message_id: i64::from(sent.id.0),
        })
    }
}

/// Long-polls updates and feeds them to `machine` until `cancel` fires.
pub async fn run_dispatcher(bot: Bot, machine: Arc<SessionMachine>, cancel: CancellationToken) {
    let on_message = {
        let machine = machine.clone();
        move |bot: Bot, msg: Message| {
            let machine = machine.clone();
            async move {
                if let Some(event) = handler::message_event(&msg) {
                    handler::dispatch(&bot, &machine, event).await;
                } else {
                    debug!(chat_id = msg.chat.id.0, "ignoring message");
                }
                respond(())
            }
        }
    };
    let on_callback = move |bot: Bot, query: CallbackQuery| {
        let machine = machine.clone();
        async move {
            if let Some(event) = handler::callback_event(&query) {
                handler::dispatch(&bot, &machine, event).await;
            } else {
                debug!(callback = %query.id, "ignoring callback without payload");
            }
            respond(())
        }
    };

    let schema = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    let mut dispatcher = Dispatcher::builder(bot, schema)
        .default_handler(|_| async {})
        .build();

    info!("starting Telegram long polling");
    tokio::select! {
        () = dispatcher.dispatch() => {}
        () = cancel.cancelled() => {}
    }
    info!("Telegram long polling stopped");
}
