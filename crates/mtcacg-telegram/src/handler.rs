// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update routing and reply rendering.
//!
//! Incoming Telegram updates become channel-agnostic [`InboundEvent`]s for
//! the session machine, and the machine's [`Reply`] list is rendered back
//! into Bot API calls. Authorization is decided by the machine.

use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatKind, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyParameters, User,
};
use tracing::warn;

use mtcacg_core::{FileReference, MtcError};
use mtcacg_session::{Actor, InboundEvent, Reply, SessionMachine, TagChoice};

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

fn actor(user: &User) -> Option<Actor> {
    let actor = Actor::new(i64::try_from(user.id.0).ok()?);
    Some(match &user.username {
        Some(username) => actor.with_username(username.clone()),
        None => actor,
    })
}

/// Converts a private photo or text message into an event.
///
/// Photos use the largest stored size. Group messages, messages without a
/// sender and other content kinds yield `None`.
pub fn message_event(msg: &Message) -> Option<InboundEvent> {
    if !is_dm(msg) {
        return None;
    }
    let actor = actor(msg.from.as_ref()?)?;
    let chat_id = msg.chat.id.0;
    let message_id = i64::from(msg.id.0);

    if let Some(photos) = msg.photo() {
        let largest = photos.last()?;
        return Some(InboundEvent::Image {
            actor,
            chat_id,
            message_id,
            file_reference: FileReference(largest.file.id.to_string()),
            width: largest.width,
            height: largest.height,
            caption: msg.caption().map(str::to_string),
        });
    }

    Some(InboundEvent::Text {
        actor,
        chat_id,
        message_id,
        text: msg.text()?.to_string(),
    })
}

/// Converts a keyboard button press into an event.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.clone()?;
    let message = query.message.as_ref()?;
    Some(InboundEvent::TagSelected {
        actor: actor(&query.from)?,
        chat_id: message.chat().id.0,
        message_id: i64::from(message.id().0),
        callback_id: query.id.to_string(),
        data,
    })
}

/// One row with a button per choice.
pub fn keyboard(choices: &[TagChoice]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        choices
            .iter()
            .map(|choice| InlineKeyboardButton::callback(choice.label(), choice.callback_data()))
            .collect::<Vec<_>>(),
    ])
}

fn message_id(id: i64) -> Result<MessageId, MtcError> {
    i32::try_from(id)
        .map(MessageId)
        .map_err(|e| MtcError::Internal(format!("message id {id} out of range: {e}")))
}

fn reply_error(what: &str, e: teloxide::RequestError) -> MtcError {
    MtcError::Delivery {
        message: format!("failed to {what}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Performs the Bot API call for one reply.
pub async fn render(bot: &Bot, reply: Reply) -> Result<(), MtcError> {
    match reply {
        Reply::Message {
            chat_id,
            reply_to,
            text,
        } => {
            let mut request = bot.send_message(ChatId(chat_id), text);
            if let Some(id) = reply_to {
                request = request.reply_parameters(ReplyParameters::new(message_id(id)?));
            }
            request
                .await
                .map_err(|e| reply_error("send message", e))?;
        }
        Reply::TagKeyboard {
            chat_id,
            text,
            choices,
        } => {
            bot.send_message(ChatId(chat_id), text)
                .reply_markup(keyboard(&choices))
                .await
                .map_err(|e| reply_error("send keyboard", e))?;
        }
        Reply::CallbackNotice { callback_id, text } => {
            let mut request = bot.answer_callback_query(CallbackQueryId(callback_id));
            if let Some(text) = text {
                request = request.text(text);
            }
            request
                .await
                .map_err(|e| reply_error("answer callback", e))?;
        }
        Reply::EditMessage {
            chat_id,
            message_id: id,
            text,
        } => {
            let result = bot
                .edit_message_text(ChatId(chat_id), message_id(id)?, text)
                .await;
            match result {
                Ok(_) => {}
                Err(e) if e.to_string().contains("message is not modified") => {}
                Err(e) => return Err(reply_error("edit message", e)),
            }
        }
    }
    Ok(())
}

/// Runs `event` through the machine and renders every reply in order.
///
/// A failed reply is logged and does not stop the remaining ones.
pub async fn dispatch(bot: &Bot, machine: &SessionMachine, event: InboundEvent) {
    for reply in machine.handle(event).await {
        if let Err(e) = render(bot, reply).await {
            warn!(error = %e, "failed to render reply");
        }
    }
}
