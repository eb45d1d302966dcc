// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gallery source adapters for the MtcACG harvester.
//!
//! Each adapter implements [`SourceAdapter`] over one site's read API and
//! knows nothing about delivery or dedup. [`build_sources`] turns the
//! `[sources.*]` configuration into ready-to-poll adapters.

pub mod cosine;
pub mod http;
pub mod manyacg;
pub mod pixiv;
pub mod yande;

use std::sync::Arc;

use mtcacg_config::PollSchedule;
use mtcacg_config::model::SourcesConfig;
use mtcacg_core::{MtcError, SourceAdapter};

pub use cosine::CosineSource;
pub use manyacg::ManyAcgSource;
pub use pixiv::PixivSource;
pub use yande::YandeSource;

/// An enabled source and the cadence it should be polled at.
pub struct ConfiguredSource {
    pub adapter: Arc<dyn SourceAdapter>,
    pub schedule: PollSchedule,
}

/// Builds every enabled source, in a fixed order.
pub fn build_sources(config: &SourcesConfig) -> Result<Vec<ConfiguredSource>, MtcError> {
    let mut sources = Vec::new();

    if config.yande.enabled {
        sources.push(ConfiguredSource {
            adapter: Arc::new(YandeSource::new(&config.yande)?),
            schedule: config.yande.schedule(),
        });
    }
    if config.pixiv.enabled {
        sources.push(ConfiguredSource {
            adapter: Arc::new(PixivSource::new(&config.pixiv)?),
            schedule: config.pixiv.schedule(),
        });
    }
    if config.manyacg.enabled {
        sources.push(ConfiguredSource {
            adapter: Arc::new(ManyAcgSource::new(&config.manyacg)?),
            schedule: config.manyacg.schedule(),
        });
    }
    if config.cosine.enabled {
        sources.push(ConfiguredSource {
            adapter: Arc::new(CosineSource::new(&config.cosine)?),
            schedule: config.cosine.schedule(),
        });
    }

    Ok(sources)
}
