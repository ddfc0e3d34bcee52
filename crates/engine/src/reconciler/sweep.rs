// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! The periodic full-state sweep (spec §4.1).
//!
//! `run` is the long-lived loop: acquire the lock, sweep, release, sleep
//! until the next tick. `sweep` is the single idempotent pass a test can
//! invoke directly without waiting on a timer.

use std::collections::BTreeSet;
use std::time::Duration as StdDuration;

use tokio_util::sync::CancellationToken;

use super::{AuditContext, GroupAssignmentInput, Reconciler};

/// Outcome of one sweep pass, surfaced for logging and for tests asserting
/// the testable-properties invariants (spec §8).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub groups_processed: usize,
    pub users_deleted: usize,
    pub failures: usize,
}

impl Reconciler {
    /// Tick on `interval` until `cancel` fires. Each tick attempts to acquire
    /// the leader lock (a no-op success under `NoopLeaderLock`); a denied
    /// lock skips the tick without error (spec §4.1).
    pub async fn run(&self, cancel: CancellationToken, interval: StdDuration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("sweep loop cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_one_tick(&cancel).await;
                }
            }
        }
    }

    async fn run_one_tick(&self, cancel: &CancellationToken) {
        match self.lock.acquire().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("lock not acquired, skipping this tick");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "leader lock acquire failed, skipping this tick");
                return;
            }
        }

        let report = self.sweep(cancel).await;
        match report {
            Ok(report) => tracing::info!(
                groups_processed = report.groups_processed,
                users_deleted = report.users_deleted,
                failures = report.failures,
                "sweep complete"
            ),
            Err(e) => tracing::warn!(error = %e, "sweep aborted by cancellation"),
        }

        self.lock.release().await;
    }

    /// One full idempotent pass over the Directory (spec §4.1 steps 1-3).
    ///
    /// Per-entity failures are logged and counted, never propagated — only
    /// `cancel` firing aborts the sweep early.
    pub async fn sweep(&self, cancel: &CancellationToken) -> idp_sync_core::Result<SweepReport> {
        let mut report = SweepReport::default();
        let ctx = AuditContext::sweep();

        let groups = self.directory.list_groups().await?;
        let groups: Vec<_> = match &self.policy.selector_prefix {
            Some(prefix) => groups.into_iter().filter(|g| g.slug.starts_with(prefix.as_str())).collect(),
            None => groups,
        };
        let mut pairs = Vec::with_capacity(groups.len());

        for group in groups {
            if cancel.is_cancelled() {
                return Err(idp_sync_core::Error::Cancelled);
            }

            let idp_group_id = match self.idp.find_group_by_directory_id(group.id).await {
                Ok(Some(existing)) => existing.id,
                Ok(None) => match self.group_create(&ctx, group.id).await {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::warn!(error = %e, dir_group_id = %group.id, "sweep: group_create failed");
                        report.failures += 1;
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, dir_group_id = %group.id, "sweep: find_group_by_directory_id failed");
                    report.failures += 1;
                    continue;
                }
            };

            if let Err(e) = self.group_membership(&ctx, group.id, &idp_group_id).await {
                tracing::warn!(error = %e, dir_group_id = %group.id, "sweep: group_membership failed");
                report.failures += 1;
            }

            report.groups_processed += 1;
            pairs.push(GroupAssignmentInput { idp_group_id, dir_group: group });
        }

        if cancel.is_cancelled() {
            return Err(idp_sync_core::Error::Cancelled);
        }

        if let Err(e) = self.groups_application_assignments(&ctx, &pairs).await {
            tracing::warn!(error = %e, "sweep: groups_application_assignments failed");
            report.failures += 1;
        }

        if cancel.is_cancelled() {
            return Err(idp_sync_core::Error::Cancelled);
        }

        let users = self.directory.list_users(true).await?;
        let idp_user_ids: BTreeSet<_> =
            self.idp.list_users().await?.into_iter().map(|u| u.id).collect();

        for user in users {
            if cancel.is_cancelled() {
                return Err(idp_sync_core::Error::Cancelled);
            }
            if !idp_sync_core::user_deleted(&user, self.clock.now(), self.policy.deletion_cutoff) {
                continue;
            }
            let Some(external_id) = &user.external_id else { continue };
            if !idp_user_ids.contains(external_id) {
                continue;
            }
            match self.user_delete(&ctx, user.id).await {
                Ok(_) => report.users_deleted += 1,
                Err(e) => {
                    tracing::warn!(error = %e, dir_user_id = %user.id, "sweep: user_delete failed");
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
