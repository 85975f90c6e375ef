// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown coordination for the service's long-lived loops.
//!
//! Termination requests (SIGTERM from the supervisor, SIGINT from a
//! terminal) are funneled into a single [`CancellationToken`] that the
//! ingress and both dispatchers watch.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn the signal watcher and hand back the token it will cancel.
///
/// The watcher task lives until the first termination signal arrives, so
/// call this once at startup.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();

    let cancel_on_signal = token.clone();
    tokio::spawn(async move {
        let signal_name = wait_for_termination().await;
        info!(signal = signal_name, "termination signal received, cancelling all loops");
        cancel_on_signal.cancel();
    });

    token
}

/// Block until a termination signal arrives; returns its name for logging.
#[cfg(unix)]
async fn wait_for_termination() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler installation failed");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
