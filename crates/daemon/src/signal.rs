// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! SIGTERM/SIGINT handling (spec §5): either signal cancels the shared root
//! [`CancellationToken`], which every long-running task (sweep loop, poller,
//! consumer, metrics server) selects on to unwind gracefully.

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn a task that cancels `cancel` on the first SIGTERM or SIGINT.
pub fn install(cancel: CancellationToken) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        cancel.cancel();
    });

    Ok(())
}
