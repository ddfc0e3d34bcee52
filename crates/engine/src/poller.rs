// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Event-log poller: projects IdP lifecycle events back onto the Directory
//! (spec §4.6).
//!
//! Bounding both ends of `get_logs_bounded` is required — a single-ended
//! query puts the upstream SDK into a different "polling mode" with
//! different semantics, per the spec's design note. The cursor
//! (`last_seen`) only advances after a successful query, so a transient
//! failure simply retries the same window, wider, next tick.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use idp_sync_adapters::{DirectoryAdapter, IdpAdapter};
use idp_sync_core::{Clock, IdpUserId, Result, UserStatus};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Default lookback applied to the cursor's cold-start value: `now -
/// cold_start_lookback` (spec §4.6).
pub const DEFAULT_COLD_START_LOOKBACK: ChronoDuration = ChronoDuration::hours(6);

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub cold_start_lookback: ChronoDuration,
    pub poll_interval: StdDuration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { cold_start_lookback: DEFAULT_COLD_START_LOOKBACK, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

pub struct EventLogPoller {
    idp: Arc<dyn IdpAdapter>,
    directory: Arc<dyn DirectoryAdapter>,
    clock: Arc<dyn Clock>,
    poll_interval: StdDuration,
    last_seen: Mutex<DateTime<Utc>>,
}

impl EventLogPoller {
    pub fn new(
        idp: Arc<dyn IdpAdapter>,
        directory: Arc<dyn DirectoryAdapter>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> Self {
        let last_seen = clock.now() - config.cold_start_lookback;
        Self { idp, directory, clock, poll_interval: config.poll_interval, last_seen: Mutex::new(last_seen) }
    }

    /// The current high-water mark, exposed for observability and tests.
    pub fn cursor(&self) -> DateTime<Utc> {
        *self.last_seen.lock()
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("event-log poller cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(error = %e, "event-log poll failed, cursor not advanced");
                    }
                }
            }
        }
    }

    /// One poll: query `(last_seen, now)`, dispatch events in publication
    /// order, and advance the cursor only on success. Returns the number of
    /// events dispatched.
    pub async fn tick(&self) -> Result<usize> {
        let since = *self.last_seen.lock();
        let q_time = self.clock.now();

        let mut events = self.idp.get_logs_bounded(since, q_time).await?;
        events.sort_by_key(|e| e.published);

        for event in &events {
            self.dispatch(event).await;
        }

        *self.last_seen.lock() = q_time;
        Ok(events.len())
    }

    async fn dispatch(&self, event: &idp_sync_core::EventLogEntry) {
        match event.event_type.as_str() {
            "user.lifecycle.create" => self.handle_user_lifecycle_create(event).await,
            other => tracing::debug!(event_type = other, "ignoring unknown event-log entry type"),
        }
    }

    /// Spec §4.6 handler for `user.lifecycle.create`.
    async fn handle_user_lifecycle_create(&self, event: &idp_sync_core::EventLogEntry) {
        for target in &event.target {
            if target.target_type != "User" {
                continue;
            }
            let idp_user_id = IdpUserId::from(target.id.clone());
            if let Err(e) = self.settle_created_user(&idp_user_id).await {
                tracing::warn!(error = %e, idp_user_id = %idp_user_id, "failed to settle user.lifecycle.create target");
            }
        }
    }

    async fn settle_created_user(&self, idp_user_id: &IdpUserId) -> Result<()> {
        let Some(idp_user) = self.idp.get_user(idp_user_id).await? else {
            tracing::warn!(idp_user_id = %idp_user_id, "user.lifecycle.create target not found in idp, skipping");
            return Ok(());
        };
        let name = format!("{} {}", idp_user.first_name, idp_user.last_name).trim().to_string();

        let matches = self.directory.find_user_by_email(&idp_user.email).await?;
        match matches.as_slice() {
            [] => {
                self.directory
                    .create_user(idp_user.email.clone(), name, idp_user_id.clone(), UserStatus::Active)
                    .await?;
            }
            [existing] => {
                let needs_settling = existing.status == UserStatus::Pending || existing.external_id.is_none();
                if needs_settling {
                    self.directory
                        .update_user(existing.id, idp_user_id.clone(), name, UserStatus::Active)
                        .await?;
                }
                // Already non-pending with a set external_id: no-op.
            }
            _ => {
                tracing::warn!(email = %idp_user.email, count = matches.len(), "multiple directory users share an email, skipping");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
