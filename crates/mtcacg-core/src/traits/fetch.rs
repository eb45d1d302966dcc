// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media fetcher trait used by the delivery pipeline to download bytes.

use async_trait::async_trait;

use crate::error::MtcError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait MediaFetcher: PluginAdapter {
    /// Downloads `url`, sending `referer` when given.
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, MtcError>;
}
