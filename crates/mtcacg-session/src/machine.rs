// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-human session arena and its transitions.
//!
//! ```text
//! (none) --image--> WaitingTitle --/no or /title X--> WaitingTag --tag--> (destroyed)
//!                     |   ^
//!                     +---+ anything else: format error
//! ```
//!
//! A new image always replaces the human's current session. Sessions live
//! in memory only and have no timeout.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use mtcacg_core::{FileReference, MtcError};
use mtcacg_pipeline::{DeliveryPipeline, ManualDelivery};

use crate::event::{InboundEvent, Reply, TagChoice};

const CONFIRM_COMMAND: &str = "/no";
const RETITLE_COMMAND: &str = "/title";

const EXPIRED_NOTICE: &str = "This session has expired. Please send the image again.";
const EMPTY_TITLE: &str = "The title cannot be empty. Reply `/title <your title>`.";
const FORMAT_ERROR: &str = "Unrecognized reply.\n- `/no` keeps the current title\n- `/title <new title>` sets a new one";
const LEDGER_FAILED: &str = "Sent to the channel, but saving to the database failed.";
const UPLOADED: &str = "Uploaded.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingTitle,
    WaitingTag,
}

/// One human's pending manual upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub state: SessionState,
    pub file_reference: FileReference,
    pub width: u32,
    pub height: u32,
    pub caption: String,
    /// The message that carried the image.
    pub origin_message_id: i64,
}

pub struct SessionMachine {
    sessions: DashMap<i64, UploadSession>,
    allowed_users: Vec<String>,
    default_caption: String,
    pipeline: Arc<DeliveryPipeline>,
}

impl SessionMachine {
    pub fn new(
        pipeline: Arc<DeliveryPipeline>,
        allowed_users: Vec<String>,
        default_caption: impl Into<String>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            allowed_users,
            default_caption: default_caption.into(),
            pipeline,
        }
    }

    /// Snapshot of a human's session.
    pub fn session(&self, user_id: i64) -> Option<UploadSession> {
        self.sessions.get(&user_id).map(|s| s.value().clone())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Applies `event` and returns what to tell the human.
    ///
    /// Events from unauthorized humans produce no replies and no state change.
    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        if !event.actor().is_authorized(&self.allowed_users) {
            debug!(user_id = event.actor().user_id, "ignoring unauthorized manual event");
            return Vec::new();
        }

        match event {
            InboundEvent::Image {
                actor,
                chat_id,
                message_id,
                file_reference,
                width,
                height,
                caption,
            } => {
                let caption = caption
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| self.default_caption.clone());
                let session = UploadSession {
                    state: SessionState::WaitingTitle,
                    file_reference,
                    width,
                    height,
                    caption,
                    origin_message_id: message_id,
                };
                let text = format!(
                    "Image received.\n\nCurrent title:\n{}\n\nReply `/title <new title>` to change it, or `/no` to keep it.",
                    session.caption
                );
                if self.sessions.insert(actor.user_id, session).is_some() {
                    debug!(user_id = actor.user_id, "replaced pending manual session");
                }
                vec![Reply::Message {
                    chat_id,
                    reply_to: Some(message_id),
                    text,
                }]
            }
            InboundEvent::Text {
                actor,
                chat_id,
                text,
                ..
            } => self.on_text(actor.user_id, chat_id, &text),
            InboundEvent::TagSelected {
                actor,
                chat_id,
                message_id,
                callback_id,
                data,
            } => {
                self.on_tag(actor.user_id, chat_id, message_id, callback_id, &data)
                    .await
            }
        }
    }

    fn on_text(&self, user_id: i64, chat_id: i64, text: &str) -> Vec<Reply> {
        let Some(mut session) = self.sessions.get_mut(&user_id) else {
            return Vec::new();
        };
        if session.state != SessionState::WaitingTitle {
            debug!(user_id, "text ignored while waiting for a tag");
            return Vec::new();
        }

        let message = |text: &str| {
            vec![Reply::Message {
                chat_id,
                reply_to: None,
                text: text.to_string(),
            }]
        };

        match parse_title_reply(text) {
            TitleReply::Confirm => {}
            TitleReply::Retitle(title) if title.is_empty() => return message(EMPTY_TITLE),
            TitleReply::Retitle(title) => session.caption = title.to_string(),
            TitleReply::Unrecognized => return message(FORMAT_ERROR),
        }
        session.state = SessionState::WaitingTag;

        vec![Reply::TagKeyboard {
            chat_id,
            text: format!("Title confirmed:\n{}\n\nPick a tag below.", session.caption),
            choices: TagChoice::ALL.to_vec(),
        }]
    }

    async fn on_tag(
        &self,
        user_id: i64,
        chat_id: i64,
        keyboard_message_id: i64,
        callback_id: String,
        data: &str,
    ) -> Vec<Reply> {
        let expired = |callback_id: String| {
            vec![Reply::CallbackNotice {
                callback_id,
                text: Some(EXPIRED_NOTICE.to_string()),
            }]
        };

        let Ok(choice) = TagChoice::from_str(data) else {
            let live = self
                .sessions
                .get(&user_id)
                .is_some_and(|s| s.state == SessionState::WaitingTag);
            if !live {
                return expired(callback_id);
            }
            warn!(user_id, data, "unknown tag payload");
            return vec![Reply::CallbackNotice {
                callback_id,
                text: None,
            }];
        };

        // Check and destroy in one step so a double press delivers once.
        let Some((_, session)) = self
            .sessions
            .remove_if(&user_id, |_, s| s.state == SessionState::WaitingTag)
        else {
            return expired(callback_id);
        };

        let manual = ManualDelivery {
            file_reference: session.file_reference.clone(),
            caption: session.caption.clone(),
            tags: choice.tags().to_string(),
            width: session.width,
            height: session.height,
        };

        let mut replies = Vec::with_capacity(3);
        match self.pipeline.deliver_manual(&manual).await {
            Ok(sent) => {
                info!(user_id, message_id = sent.message_id, tag = %choice, "manual upload sent");
                replies.push(Reply::Message {
                    chat_id,
                    reply_to: Some(session.origin_message_id),
                    text: UPLOADED.to_string(),
                });
            }
            Err(e @ MtcError::LedgerWrite { .. }) => {
                warn!(user_id, error = %e, "manual upload not recorded");
                replies.push(Reply::Message {
                    chat_id,
                    reply_to: None,
                    text: LEDGER_FAILED.to_string(),
                });
            }
            Err(e) => {
                warn!(user_id, error = %e, "manual upload failed");
                replies.push(Reply::Message {
                    chat_id,
                    reply_to: None,
                    text: format!("Send failed ({e})"),
                });
            }
        }

        replies.push(Reply::EditMessage {
            chat_id,
            message_id: keyboard_message_id,
            text: format!("Processed:\n{}\n\nTags: {}", session.caption, choice.tags()),
        });
        replies.push(Reply::CallbackNotice {
            callback_id,
            text: None,
        });
        replies
    }
}

enum TitleReply<'a> {
    Confirm,
    Retitle(&'a str),
    Unrecognized,
}

fn parse_title_reply(text: &str) -> TitleReply<'_> {
    let text = text.trim();
    if text == CONFIRM_COMMAND {
        return TitleReply::Confirm;
    }
    match text.strip_prefix(RETITLE_COMMAND) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            TitleReply::Retitle(rest.trim())
        }
        _ => TitleReply::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtcacg_core::PhotoInput;
    use mtcacg_pipeline::SizeNormalizer;
    use mtcacg_storage::HistoryLedger;
    use mtcacg_test_utils::{MemoryLedgerStore, MockFetcher, MockTarget};

    use crate::event::Actor;

    const OWNER: i64 = 42;
    const CHAT: i64 = 42;

    struct Harness {
        machine: SessionMachine,
        store: Arc<MemoryLedgerStore>,
        target: Arc<MockTarget>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryLedgerStore::new());
        let target = Arc::new(MockTarget::new());
        let ledger = HistoryLedger::new(store.clone());
        ledger.sync_from_remote().await.expect("sync");
        let pipeline = Arc::new(DeliveryPipeline::new(
            ledger,
            target.clone(),
            Arc::new(MockFetcher::new()),
            SizeNormalizer::default(),
            1024,
        ));
        Harness {
            machine: SessionMachine::new(pipeline, vec![OWNER.to_string()], "MtcACG:TG"),
            store,
            target,
        }
    }

    fn image(user: i64, message_id: i64, file: &str, caption: Option<&str>) -> InboundEvent {
        InboundEvent::Image {
            actor: Actor::new(user),
            chat_id: CHAT,
            message_id,
            file_reference: FileReference(file.into()),
            width: 1280,
            height: 720,
            caption: caption.map(str::to_string),
        }
    }

    fn text(user: i64, body: &str) -> InboundEvent {
        InboundEvent::Text {
            actor: Actor::new(user),
            chat_id: CHAT,
            message_id: 99,
            text: body.into(),
        }
    }

    fn tag(user: i64, data: &str) -> InboundEvent {
        InboundEvent::TagSelected {
            actor: Actor::new(user),
            chat_id: CHAT,
            message_id: 77,
            callback_id: "cb-1".into(),
            data: data.into(),
        }
    }

    fn expired() -> Reply {
        Reply::CallbackNotice {
            callback_id: "cb-1".into(),
            text: Some(EXPIRED_NOTICE.into()),
        }
    }

    #[tokio::test]
    async fn confirm_then_sfw_records_original_caption() {
        let h = harness().await;

        let replies = h.machine.handle(image(OWNER, 10, "photo-a", Some("Original"))).await;
        assert!(matches!(
            &replies[..],
            [Reply::Message { reply_to: Some(10), text, .. }] if text.contains("Original")
        ));

        let replies = h.machine.handle(text(OWNER, "/no")).await;
        assert!(matches!(&replies[..], [Reply::TagKeyboard { choices, .. }] if choices.len() == 2));
        assert_eq!(
            h.machine.session(OWNER).map(|s| s.state),
            Some(SessionState::WaitingTag)
        );

        let replies = h.machine.handle(tag(OWNER, "tag_sfw")).await;
        assert_eq!(
            replies,
            vec![
                Reply::Message {
                    chat_id: CHAT,
                    reply_to: Some(10),
                    text: UPLOADED.into(),
                },
                Reply::EditMessage {
                    chat_id: CHAT,
                    message_id: 77,
                    text: "Processed:\nOriginal\n\nTags: #TGC #SFW".into(),
                },
                Reply::CallbackNotice {
                    callback_id: "cb-1".into(),
                    text: None,
                },
            ]
        );

        let row = h.store.get("manual_100").await.expect("recorded");
        assert_eq!(row.caption, "Original");
        assert!(row.tags.contains("#SFW"));
        assert_eq!(row.file_reference, FileReference("photo-a".into()));
        assert!(h.machine.session(OWNER).is_none());

        assert_eq!(h.machine.handle(tag(OWNER, "tag_sfw")).await, vec![expired()]);
    }

    #[tokio::test]
    async fn retitle_then_nsfw_records_new_caption() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "photo-b", None)).await;
        assert_eq!(
            h.machine.session(OWNER).map(|s| s.caption),
            Some("MtcACG:TG".to_string())
        );

        h.machine.handle(text(OWNER, "/title Foo")).await;
        h.machine.handle(tag(OWNER, "tag_nsfw")).await;

        let row = h.store.get("manual_100").await.expect("recorded");
        assert_eq!(row.caption, "Foo");
        assert_eq!(row.tags, "#TGC #NSFW #R18 manual");
        assert_eq!((row.width, row.height), (1280, 720));

        let sent = h.target.sent().await;
        assert_eq!(sent[0].caption, "Foo\nTags: #TGC #NSFW #R18");
        assert_eq!(sent[0].photo, PhotoInput::Existing(FileReference("photo-b".into())));
    }

    #[tokio::test]
    async fn empty_title_and_unknown_text_keep_waiting_for_title() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "photo", None)).await;

        for (body, expected) in [("/title   ", EMPTY_TITLE), ("/title", EMPTY_TITLE), ("hello", FORMAT_ERROR), ("/titles x", FORMAT_ERROR)] {
            let replies = h.machine.handle(text(OWNER, body)).await;
            assert_eq!(
                replies,
                vec![Reply::Message {
                    chat_id: CHAT,
                    reply_to: None,
                    text: expected.into(),
                }],
                "reply to {body:?}"
            );
            assert_eq!(
                h.machine.session(OWNER).map(|s| s.state),
                Some(SessionState::WaitingTitle)
            );
        }
    }

    #[tokio::test]
    async fn unauthorized_events_are_ignored_silently() {
        let h = harness().await;
        assert!(h.machine.handle(image(7, 10, "photo", None)).await.is_empty());
        assert!(h.machine.handle(tag(7, "tag_sfw")).await.is_empty());
        assert_eq!(h.machine.active_sessions(), 0);
    }

    #[tokio::test]
    async fn events_without_a_session_are_ignored_except_tags() {
        let h = harness().await;
        assert!(h.machine.handle(text(OWNER, "/no")).await.is_empty());
        assert_eq!(h.machine.handle(tag(OWNER, "tag_nsfw")).await, vec![expired()]);
    }

    #[tokio::test]
    async fn tag_before_title_is_expired_and_keeps_session() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "photo", None)).await;
        assert_eq!(h.machine.handle(tag(OWNER, "tag_sfw")).await, vec![expired()]);
        assert_eq!(
            h.machine.session(OWNER).map(|s| s.state),
            Some(SessionState::WaitingTitle)
        );
        assert_eq!(h.target.sent_count().await, 0);
    }

    #[tokio::test]
    async fn text_while_waiting_for_tag_is_ignored() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "photo", Some("Keep"))).await;
        h.machine.handle(text(OWNER, "/no")).await;
        assert!(h.machine.handle(text(OWNER, "/title Other")).await.is_empty());
        assert_eq!(
            h.machine.session(OWNER).map(|s| s.caption),
            Some("Keep".to_string())
        );
    }

    #[tokio::test]
    async fn new_image_replaces_pending_session() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "first", Some("One"))).await;
        h.machine.handle(text(OWNER, "/no")).await;
        h.machine.handle(image(OWNER, 11, "second", Some("Two"))).await;

        let session = h.machine.session(OWNER).expect("session");
        assert_eq!(session.file_reference, FileReference("second".into()));
        assert_eq!(session.state, SessionState::WaitingTitle);
        assert_eq!(session.origin_message_id, 11);
        assert_eq!(h.machine.active_sessions(), 1);
    }

    #[tokio::test]
    async fn unknown_payload_leaves_live_session_alone() {
        let h = harness().await;
        h.machine.handle(image(OWNER, 10, "photo", None)).await;
        h.machine.handle(text(OWNER, "/no")).await;

        let replies = h.machine.handle(tag(OWNER, "tag_other")).await;
        assert_eq!(
            replies,
            vec![Reply::CallbackNotice {
                callback_id: "cb-1".into(),
                text: None,
            }]
        );
        assert!(h.machine.session(OWNER).is_some());
    }

    #[tokio::test]
    async fn send_failure_reports_and_destroys_session() {
        let h = harness().await;
        h.target.set_failing(true);
        h.machine.handle(image(OWNER, 10, "photo", None)).await;
        h.machine.handle(text(OWNER, "/no")).await;

        let replies = h.machine.handle(tag(OWNER, "tag_sfw")).await;
        assert!(matches!(
            &replies[0],
            Reply::Message { reply_to: None, text, .. } if text.starts_with("Send failed (")
        ));
        assert!(matches!(replies[1], Reply::EditMessage { .. }));
        assert!(h.machine.session(OWNER).is_none());
        assert_eq!(h.store.row_count().await, 0);
    }

    #[tokio::test]
    async fn ledger_failure_after_send_is_reported() {
        let h = harness().await;
        h.store.set_fail_inserts(true);
        h.machine.handle(image(OWNER, 10, "photo", None)).await;
        h.machine.handle(text(OWNER, "/no")).await;

        let replies = h.machine.handle(tag(OWNER, "tag_sfw")).await;
        assert_eq!(
            replies[0],
            Reply::Message {
                chat_id: CHAT,
                reply_to: None,
                text: LEDGER_FAILED.into(),
            }
        );
        assert_eq!(h.target.sent_count().await, 1);
    }
}
