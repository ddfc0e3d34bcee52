// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! `tracing` setup (spec §4.11): `EnvFilter` verbosity from `RUST_LOG` or
//! `IDP_SYNC_LOG`, optionally rotated to a daemon log file the same way the
//! teacher's daemon rotates its own.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn build_filter() -> EnvFilter {
    if let Ok(directive) = std::env::var("IDP_SYNC_LOG") {
        return EnvFilter::new(directive);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. When `log_dir` is set, logs are also
/// written to a rotating file there in addition to stderr; the returned
/// guard must be kept alive for the process lifetime or buffered lines are
/// dropped on exit.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = build_filter();

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "idp-sync.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            None
        }
    }
}
