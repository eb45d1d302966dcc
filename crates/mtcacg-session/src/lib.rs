// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manual upload flow for the MtcACG harvester.
//!
//! A human sends an image to the bot, confirms or replaces its title, then
//! picks a tag set. The [`SessionMachine`] tracks one [`UploadSession`] per
//! human and answers every [`InboundEvent`] with a list of [`Reply`] values
//! that the chat layer renders. It never talks to the chat API itself.

pub mod event;
pub mod machine;

pub use event::{Actor, InboundEvent, Reply, TagChoice};
pub use machine::{SessionMachine, SessionState, UploadSession};
