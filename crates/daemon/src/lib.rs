// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! idp-sync-daemon: the process-level glue that turns `idp-sync-engine`
//! into a running service — configuration, logging, signal handling, the
//! `/metrics`+`/healthz` HTTP responder, and the long-running `serve` loop
//! that starts the sweep, the event-log poller and the bus consumer side by
//! side on a shared cancellation token.
//!
//! This crate builds the real adapters (`HttpDirectoryAdapter`,
//! `HttpIdpAdapter`, `NatsLeaderLock`/`NoopLeaderLock`, `FileAuditSink`) from
//! [`config::Config`] and wires them into an [`idp_sync_engine::Reconciler`];
//! `idp-sync-cli` only needs to call [`App::build`] and run one of its
//! methods.

pub mod config;
pub mod duration;
pub mod logging;
pub mod metrics_server;
pub mod signal;

use std::sync::Arc;

use idp_sync_adapters::{
    DirectoryAdapter, FileAuditSink, HttpDirectoryAdapter, HttpIdpAdapter, IdpAdapter, LeaderLock,
    NatsLeaderLock, NoopLeaderLock,
};
use idp_sync_core::{Clock, Result, SystemClock};
use idp_sync_engine::{ConsumerConfig, Counters, EventConsumer, EventLogPoller, PollerConfig, Reconciler, ReconcilerPolicy};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::metrics_server::HealthState;

/// Everything `serve` and the one-shot `sync` subcommands are built from.
pub struct App {
    pub config: Config,
    pub reconciler: Arc<Reconciler>,
    pub directory: Arc<dyn DirectoryAdapter>,
    pub idp: Arc<dyn IdpAdapter>,
    pub metrics: Arc<Counters>,
    pub health: Arc<HealthState>,
    pub cancel: CancellationToken,
}

impl App {
    /// Build every adapter and the reconciler from a resolved [`Config`].
    /// Blocks (with retry) until the audit log file is writable, per the
    /// audit sink's documented startup contract.
    pub async fn build(config: Config) -> Result<Self> {
        let directory: Arc<dyn DirectoryAdapter> = Arc::new(HttpDirectoryAdapter::new(
            idp_sync_adapters::directory::DirectoryConfig {
                base_url: config.directory.base_url.clone(),
                token_url: config.directory.token_url.clone(),
                client_id: config.directory.client_id.clone(),
                client_secret: config.directory.client_secret.clone(),
                audience: config.directory.audience.clone(),
                scopes: config.directory.scopes.clone(),
            },
        ));

        let idp: Arc<dyn IdpAdapter> = Arc::new(HttpIdpAdapter::new(idp_sync_adapters::idp::IdpConfig {
            base_url: config.idp.base_url.clone(),
            api_token: config.idp.api_token.clone(),
            application_type_filter: config.idp.application_type_filter.clone(),
        }));

        let audit = FileAuditSink::open(
            config.audit_log_path.clone(),
            config.audit_retry_interval,
            config.audit_max_wait,
        )
        .await
        .map_err(|e| idp_sync_core::Error::Config(e.to_string()))?;

        let lock: Arc<dyn LeaderLock> = if config.lock.enabled {
            let client = async_nats::connect(&config.bus.url)
                .await
                .map_err(|e| idp_sync_core::Error::Config(format!("failed to connect to bus for lock: {e}")))?;
            let ttl = config.reconciler_interval + config.lock.ttl_margin;
            Arc::new(
                NatsLeaderLock::new(client, &config.lock.bucket, &config.lock.key, ttl, holder_id())
                    .await?,
            )
        } else {
            Arc::new(NoopLeaderLock)
        };

        let metrics = Arc::new(Counters::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let policy = ReconcilerPolicy {
            dry_run: config.dry_run,
            skip_delete: config.skip_delete,
            deletion_cutoff: config.deletion_cutoff,
            selector_prefix: config.selector_prefix.clone(),
        };

        let reconciler = Arc::new(Reconciler::new(
            directory.clone(),
            idp.clone(),
            Arc::new(audit),
            lock,
            clock,
            metrics.clone(),
            policy,
        ));

        Ok(Self {
            config,
            reconciler,
            directory,
            idp,
            metrics,
            health: HealthState::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Run the long-lived `serve` command: sweep loop, event-log poller, bus
    /// consumer, and the `/metrics`+`/healthz` responder, all racing the
    /// shared cancellation token.
    pub async fn serve(self) -> Result<()> {
        let cancel = self.cancel.clone();
        signal::install(cancel.clone())
            .map_err(|e| idp_sync_core::Error::Config(format!("failed to install signal handler: {e}")))?;

        let bus_client = self.connect_bus().await?;

        let mut tasks = tokio::task::JoinSet::new();

        {
            let reconciler = self.reconciler.clone();
            let cancel = cancel.clone();
            let interval = self.config.reconciler_interval;
            tasks.spawn(async move {
                reconciler.run(cancel, interval).await;
            });
        }

        {
            // Heartbeat for /healthz: a liveness signal independent of any
            // single sweep's success, ticking on the same interval.
            let health = self.health.clone();
            let cancel = cancel.clone();
            let interval = self.config.reconciler_interval;
            tasks.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                health.set_leader(true);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = ticker.tick() => health.record_sweep(chrono::Utc::now()),
                    }
                }
            });
        }

        {
            let poller = Arc::new(EventLogPoller::new(
                self.idp.clone(),
                self.directory.clone(),
                Arc::new(SystemClock),
                PollerConfig {
                    cold_start_lookback: self.config.cold_start_lookback,
                    poll_interval: self.config.poll_interval,
                },
            ));
            let cancel = cancel.clone();
            tasks.spawn(async move {
                poller.run(cancel).await;
            });
        }

        {
            let consumer = EventConsumer::new(
                self.reconciler.clone(),
                ConsumerConfig {
                    subject_prefix: self.config.bus.subject_prefix.clone(),
                    queue_group: self.config.bus.queue_group.clone(),
                    queue_size: self.config.bus.queue_size,
                },
            );
            let cancel = cancel.clone();
            tasks.spawn(async move {
                if let Err(e) = consumer.run(bus_client, cancel).await {
                    tracing::error!(error = %e, "event consumer exited with error");
                }
            });
        }

        {
            let metrics = self.metrics.clone();
            let health = self.health.clone();
            let addr = self.config.metrics_addr.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                if let Err(e) = metrics_server::run(&addr, metrics, health, cancel).await {
                    tracing::error!(error = %e, "metrics server exited with error");
                }
            });
        }

        while tasks.join_next().await.is_some() {}
        Ok(())
    }

    async fn connect_bus(&self) -> Result<async_nats::Client> {
        let mut options = async_nats::ConnectOptions::new();
        if let Some(creds_file) = &self.config.bus.creds_file {
            options = options
                .credentials_file(creds_file)
                .await
                .map_err(|e| idp_sync_core::Error::Config(format!("failed to load bus credentials: {e}")))?;
        } else if let Some(socket) = &self.config.bus.identity_runtime_socket {
            let client = idp_sync_adapters::identity_runtime::SocketIdentityRuntimeClient::new(
                socket.clone(),
                self.config.bus.identity_runtime_timeout,
            );
            let token = client.resolve_or_empty().await;
            if !token.is_empty() {
                options = options.token(token);
            }
        }
        options
            .connect(&self.config.bus.url)
            .await
            .map_err(|e| idp_sync_core::Error::Config(format!("failed to connect to bus {}: {e}", self.config.bus.url)))
    }

    /// One-shot `sync` command: a single full reconciliation pass, run
    /// without waiting on the periodic ticker.
    pub async fn sync_once(&self) -> Result<idp_sync_engine::SweepReport> {
        self.reconciler.sweep(&CancellationToken::new()).await
    }
}

fn holder_id() -> String {
    format!("{}-{}", hostname(), std::process::id())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "idp-sync".to_string())
}

/// Install logging, returning the guard that must stay alive for the
/// non-blocking file appender to keep flushing.
pub fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    logging::init(config.log_dir.as_deref())
}

