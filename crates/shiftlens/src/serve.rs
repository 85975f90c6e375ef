// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shiftlens serve` command implementation.
//!
//! Wires the configured pieces together: Postgres store (with migrations on
//! open), content-addressed blob store, the two background dispatchers, and
//! the Telegram ingress. Every long-lived piece monitors one shared
//! [`CancellationToken`] installed by the signal handler.

use std::sync::Arc;

use tracing::{info, warn};

use shiftlens_blob::FsObjectStore;
use shiftlens_config::{ShiftlensConfig, validate_config};
use shiftlens_core::ShiftlensError;
use shiftlens_dispatch::{ClaimDispatcher, DeliveryDispatcher, install_signal_handler};
use shiftlens_storage::Database;
use shiftlens_telegram::{TelegramIngress, TelegramSender, handler::IngressDeps};

/// Runs the `shiftlens serve` command.
pub async fn run_serve(config: ShiftlensConfig) -> Result<(), ShiftlensError> {
    init_tracing(&config.service.log_level);
    info!(service = config.service.name.as_str(), "starting shiftlens serve");

    check_config(&config)?;

    // Install signal handler first so a Ctrl+C during startup still wins.
    let cancel = install_signal_handler();

    // Connect the store; absence of a database URL disables the whole core.
    let db = match &config.storage.database_url {
        Some(url) => Some(Database::connect(url, config.storage.max_connections).await?),
        None => {
            warn!("storage.database_url not set; persistence and dispatchers are disabled");
            None
        }
    };

    let blob = Arc::new(FsObjectStore::new(&config.blob.root_dir));
    info!(root_dir = config.blob.root_dir.as_str(), "blob store ready");

    // The ingress is built before the dispatchers because the delivery
    // dispatcher borrows its Bot for the notification sender.
    let ingress = match config.telegram.bot_token {
        Some(_) => Some(TelegramIngress::new(
            config.telegram.clone(),
            IngressDeps {
                db: db.clone(),
                blob: blob.clone(),
            },
        )?),
        None => {
            info!("telegram ingress disabled (no bot_token configured)");
            None
        }
    };

    let mut tasks = Vec::new();

    if let Some(db) = &db {
        let claim = ClaimDispatcher::new(db.clone(), config.dispatcher.sessions.clone());
        tasks.push(tokio::spawn(claim.run(cancel.clone())));

        match &ingress {
            Some(ingress) => {
                let sender = Arc::new(TelegramSender::new(ingress.bot().clone()));
                let delivery = DeliveryDispatcher::new(
                    db.clone(),
                    sender,
                    config.dispatcher.notifications.clone(),
                );
                tasks.push(tokio::spawn(delivery.run(cancel.clone())));
            }
            None => {
                info!("notification delivery dispatcher disabled (no telegram bot token)");
            }
        }
    }

    // Run the ingress in the foreground; without one, just wait for shutdown.
    match ingress {
        Some(ingress) => ingress.run(cancel.clone()).await,
        None => cancel.cancelled().await,
    }

    for task in tasks {
        let _ = task.await;
    }

    if let Some(db) = db {
        db.close().await;
    }

    info!("shiftlens serve shutdown complete");
    Ok(())
}

/// Runs the `shiftlens migrate` command: connect (which applies pending
/// migrations), verify the connection, and exit.
pub async fn run_migrate(config: ShiftlensConfig) -> Result<(), ShiftlensError> {
    init_tracing(&config.service.log_level);
    check_config(&config)?;

    let url = config.storage.database_url.as_deref().ok_or_else(|| {
        ShiftlensError::Config("storage.database_url is required for migrate".into())
    })?;

    let db = Database::connect(url, 1).await?;
    db.health_check().await?;
    db.close().await;

    info!("migrations applied");
    Ok(())
}

fn check_config(config: &ShiftlensConfig) -> Result<(), ShiftlensError> {
    validate_config(config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ShiftlensError::Config(joined)
    })
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shiftlens={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
