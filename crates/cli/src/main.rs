// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! `idp-sync` — one long-running `serve` command and three one-shot `sync`
//! subcommands. Exit codes: 0 success, 1 fatal configuration or startup
//! error, carried out of `main()` via [`exit_error::ExitError`].

mod exit_error;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use exit_error::ExitError;
use idp_sync_daemon::config::{self, ConfigOverrides};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "idp-sync", version = VERSION, about = "Directory to IdP one-way sync controller")]
struct Cli {
    /// Path to a TOML configuration file (also readable from IDP_SYNC_CONFIG).
    #[arg(long, global = true, env = "IDP_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the long-lived reconciliation service: periodic sweep, event-log
    /// poller, bus consumer and the metrics/health responder.
    Serve(SyncFlags),
    /// One-shot reconciliation passes. All three subcommands drive the same
    /// canonical sweep — they exist for operator intent, not for separate
    /// code paths.
    Sync {
        #[command(subcommand)]
        entity: SyncEntity,
    },
}

#[derive(Subcommand)]
enum SyncEntity {
    /// Converge group existence, profile and membership.
    Groups(SyncFlags),
    /// Converge user lifecycle state.
    Users(SyncFlags),
    /// Converge group membership only (still a full sweep underneath).
    Members(SyncFlags),
}

#[derive(Args, Clone)]
struct SyncFlags {
    /// Compute and log intended changes without mutating the IdP.
    #[arg(long, env = "IDP_SYNC_DRY_RUN")]
    dry_run: bool,
    /// Only operate on Directory groups whose slug starts with this prefix.
    #[arg(long, env = "IDP_SYNC_SELECTOR_PREFIX")]
    selector_prefix: Option<String>,
}

impl SyncFlags {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            dry_run: if self.dry_run { Some(true) } else { None },
            selector_prefix: self.selector_prefix,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("idp-sync: {e}");
            match e.downcast_ref::<ExitError>() {
                Some(exit) => exit.code,
                None => 1,
            }
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (overrides, config_path) = match &cli.command {
        Command::Serve(flags) => (flags.clone().into_overrides(), cli.config.clone()),
        Command::Sync { entity } => {
            let flags = match entity {
                SyncEntity::Groups(f) | SyncEntity::Users(f) | SyncEntity::Members(f) => f.clone(),
            };
            (flags.into_overrides(), cli.config.clone())
        }
    };

    let config_path = config::resolve_config_path(config_path);
    let resolved = config::load(config_path.as_deref(), overrides)
        .map_err(|e| ExitError::startup(format!("failed to load configuration: {e}")))?;

    let _log_guard = idp_sync_daemon::init_logging(&resolved);

    let app = idp_sync_daemon::App::build(resolved)
        .await
        .map_err(|e| ExitError::startup(format!("failed to start: {e}")))?;

    match cli.command {
        Command::Serve(_) => {
            app.serve().await.map_err(|e| ExitError::new(1, e.to_string()))?;
        }
        Command::Sync { .. } => {
            let report = app.sync_once().await.map_err(|e| ExitError::new(1, e.to_string()))?;
            tracing::info!(
                groups_processed = report.groups_processed,
                users_deleted = report.users_deleted,
                failures = report.failures,
                "one-shot sync complete"
            );
            if report.failures > 0 {
                return Err(ExitError::new(1, format!("{} entities failed to reconcile", report.failures)).into());
            }
        }
    }

    Ok(())
}
