// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery target trait for the channel that receives finished content.

use async_trait::async_trait;

use crate::error::MtcError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{PhotoInput, SentPhoto};

/// The single channel that receives delivered photos.
#[async_trait]
pub trait DeliveryTarget: PluginAdapter {
    /// Largest upload the transport accepts, in bytes.
    fn max_payload_bytes(&self) -> usize;

    /// Sends a photo with a caption.
    ///
    /// Sending [`PhotoInput::Existing`] must not re-upload any bytes.
    async fn send_photo(&self, photo: PhotoInput, caption: &str) -> Result<SentPhoto, MtcError>;
}
