// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound events and outbound replies of the manual upload flow.

use strum::{Display, EnumString};

use mtcacg_core::FileReference;

/// The human behind an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub username: Option<String>,
}

impl Actor {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Whether the actor's id or username appears in `allowed_users`.
    ///
    /// Usernames match case-insensitively, with or without a leading `@`.
    /// An empty list authorizes nobody.
    pub fn is_authorized(&self, allowed_users: &[String]) -> bool {
        let user_id = self.user_id.to_string();
        allowed_users.iter().any(|allowed| {
            if *allowed == user_id {
                return true;
            }
            let allowed = allowed.strip_prefix('@').unwrap_or(allowed);
            self.username
                .as_deref()
                .is_some_and(|username| username.eq_ignore_ascii_case(allowed))
        })
    }
}

/// Tag sets offered on the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum TagChoice {
    #[strum(serialize = "tag_sfw")]
    Sfw,
    #[strum(serialize = "tag_nsfw")]
    Nsfw,
}

impl TagChoice {
    pub const ALL: [TagChoice; 2] = [TagChoice::Sfw, TagChoice::Nsfw];

    /// Hashtags appended to the channel caption.
    pub fn tags(self) -> &'static str {
        match self {
            TagChoice::Sfw => "#TGC #SFW",
            TagChoice::Nsfw => "#TGC #NSFW #R18",
        }
    }

    /// Button text.
    pub fn label(self) -> &'static str {
        match self {
            TagChoice::Sfw => "TG-SFW",
            TagChoice::Nsfw => "TG-NSFW",
        }
    }

    /// Callback payload carried by the button.
    pub fn callback_data(self) -> String {
        self.to_string()
    }
}

/// Something a human did in a chat with the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Image {
        actor: Actor,
        chat_id: i64,
        message_id: i64,
        file_reference: FileReference,
        width: u32,
        height: u32,
        caption: Option<String>,
    },
    Text {
        actor: Actor,
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    /// A keyboard button press. `data` is the raw callback payload.
    TagSelected {
        actor: Actor,
        chat_id: i64,
        /// The message carrying the keyboard.
        message_id: i64,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    pub fn actor(&self) -> &Actor {
        match self {
            InboundEvent::Image { actor, .. }
            | InboundEvent::Text { actor, .. }
            | InboundEvent::TagSelected { actor, .. } => actor,
        }
    }
}

/// Something the chat layer should do in response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain message, optionally replying to an earlier one.
    Message {
        chat_id: i64,
        reply_to: Option<i64>,
        text: String,
    },
    /// Message with the tag selection keyboard.
    TagKeyboard {
        chat_id: i64,
        text: String,
        choices: Vec<TagChoice>,
    },
    /// Answers a button press. `text` is shown as a toast when present.
    CallbackNotice {
        callback_id: String,
        text: Option<String>,
    },
    /// Replaces the text of an earlier bot message.
    EditMessage {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn authorized_by_id_or_username() {
        let actor = Actor::new(12345).with_username("TestUser");
        assert!(actor.is_authorized(&["12345".into()]));
        assert!(actor.is_authorized(&["testuser".into()]));
        assert!(actor.is_authorized(&["@testuser".into()]));
        assert!(!actor.is_authorized(&["99999".into()]));
        assert!(!actor.is_authorized(&[]));
        assert!(!Actor::new(1).is_authorized(&["@someone".into()]));
    }

    #[test]
    fn tag_choices_parse_from_callback_data() {
        assert_eq!(TagChoice::from_str("tag_sfw").ok(), Some(TagChoice::Sfw));
        assert_eq!(TagChoice::from_str("tag_nsfw").ok(), Some(TagChoice::Nsfw));
        assert!(TagChoice::from_str("tag_other").is_err());
        assert_eq!(TagChoice::Nsfw.callback_data(), "tag_nsfw");
        assert_eq!(TagChoice::Nsfw.tags(), "#TGC #NSFW #R18");
    }
}
