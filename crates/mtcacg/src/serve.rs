// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mtcacg serve` command implementation.
//!
//! Opens the ledger, builds one delivery pipeline shared by every poller and
//! the manual upload flow, then runs until SIGINT or SIGTERM.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use mtcacg_config::MtcConfig;
use mtcacg_core::MtcError;
use mtcacg_pipeline::{DeliveryPipeline, HttpFetcher, SizeNormalizer, SourcePoller, recording};
use mtcacg_session::SessionMachine;
use mtcacg_sources::build_sources;
use mtcacg_storage::{HistoryLedger, open_store};
use mtcacg_telegram::{TelegramTarget, bot_from_config, run_dispatcher};

use crate::shutdown;

/// Runs the `mtcacg serve` command.
pub async fn run_serve(config: MtcConfig) -> Result<(), MtcError> {
    init_tracing(&config.daemon.log_level);
    recording::register_metrics();

    info!("starting mtcacg serve");

    let bot = bot_from_config(&config.telegram)?;
    let target = Arc::new(TelegramTarget::new(bot.clone(), &config.telegram)?);

    let store = open_store(&config.ledger).await?;
    let ledger = HistoryLedger::new(store);
    match ledger.sync_from_remote().await {
        Ok(count) => info!(count, "ledger synced"),
        // Pollers retry at the top of every cycle.
        Err(e) => warn!(error = %e, "initial ledger sync failed"),
    }

    let pipeline = Arc::new(DeliveryPipeline::new(
        ledger,
        target,
        Arc::new(HttpFetcher::new()?),
        SizeNormalizer::from_config(&config.normalizer),
        config.telegram.caption_limit,
    ));

    let sources = build_sources(&config.sources)?;
    let cancel = shutdown::install_signal_handler();
    let mut tasks = JoinSet::new();

    for source in sources {
        let poller = SourcePoller::new(source.adapter, pipeline.clone(), source.schedule);
        info!(source = poller.source_name(), "starting poller");
        let cancel = cancel.clone();
        tasks.spawn(async move { poller.run(cancel).await });
    }

    let machine = Arc::new(SessionMachine::new(
        pipeline,
        config.telegram.allowed_users.clone(),
        config.telegram.default_caption.clone(),
    ));
    if config.telegram.allowed_users.is_empty() {
        info!("no allowed_users configured, manual uploads are disabled");
    }
    tasks.spawn(run_dispatcher(bot, machine, cancel.clone()));

    cancel.cancelled().await;
    info!(tasks = tasks.len(), "waiting for tasks to stop");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "task ended abnormally");
        }
    }

    info!("mtcacg stopped");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mtcacg={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
