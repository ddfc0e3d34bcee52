// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Bus event consumer: subscribes to `<prefix>.{groups,members,users}` and
//! routes decoded messages onto the reconciler (spec §4.7).
//!
//! [`EventConsumer::dispatch`] is the pure routing table and is what the
//! tests drive directly; [`EventConsumer::run`] is the thin NATS plumbing
//! around it (queue-group subscriptions, one task per subject times the
//! configured queue size, all sharing the root cancellation token).

use std::sync::Arc;

use futures::StreamExt;
use idp_sync_core::{BusAction, Error, Result};
use idp_sync_wire::{BusMessage, Subject};
use tokio_util::sync::CancellationToken;

use crate::reconciler::{AuditContext, GroupAssignmentInput, Reconciler};

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub subject_prefix: String,
    pub queue_group: String,
    /// Number of identical subscribers opened per subject, for local
    /// parallelism (spec §4.7).
    pub queue_size: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            subject_prefix: idp_sync_wire::DEFAULT_SUBJECT_PREFIX.to_string(),
            queue_group: "idp-sync".to_string(),
            queue_size: 1,
        }
    }
}

pub struct EventConsumer {
    reconciler: Arc<Reconciler>,
    config: ConsumerConfig,
}

impl EventConsumer {
    pub fn new(reconciler: Arc<Reconciler>, config: ConsumerConfig) -> Self {
        Self { reconciler, config }
    }

    /// Subscribe to all three subjects under the configured prefix and
    /// route messages until `cancel` fires. Each subject gets
    /// `config.queue_size` identical queue-group subscribers.
    pub async fn run(&self, client: async_nats::Client, cancel: CancellationToken) -> Result<()> {
        let mut tasks = tokio::task::JoinSet::new();

        for subject in Subject::ALL {
            let full = subject.full(&self.config.subject_prefix);
            for _ in 0..self.config.queue_size.max(1) {
                let sub = client
                    .queue_subscribe(full.clone(), self.config.queue_group.clone())
                    .await
                    .map_err(|e| Error::Config(format!("failed to subscribe to {full}: {e}")))?;
                let cancel = cancel.clone();
                let consumer = EventConsumer { reconciler: self.reconciler.clone(), config: self.config.clone() };
                tasks.spawn(async move {
                    run_subscriber(sub, subject, consumer, cancel).await;
                });
            }
        }

        while tasks.join_next().await.is_some() {}
        Ok(())
    }

    /// Decode, validate and route one message (spec §4.7's dispatch table).
    /// Unhandled `(subject, action)` pairs and handler errors are logged and
    /// treated as handled — the periodic sweep is the fallback.
    pub async fn dispatch(&self, subject: Subject, payload: &[u8], queue_group: &str) {
        let msg = match BusMessage::decode(payload, subject) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, %subject, "dropping malformed bus message");
                return;
            }
        };
        let ctx = AuditContext::bus(msg.audit_id.clone(), subject.to_string(), queue_group.to_string());

        if let Err(e) = self.route(&ctx, subject, &msg).await {
            tracing::warn!(error = %e, %subject, action = ?msg.action, audit_id = %msg.audit_id, "bus message handler failed");
        }
    }

    async fn route(&self, ctx: &AuditContext, subject: Subject, msg: &BusMessage) -> Result<()> {
        match (subject, msg.action) {
            (Subject::Groups, BusAction::Create) => {
                let dir_group_id = msg.group_id.ok_or_else(missing_group_id)?;
                let idp_group_id = self.reconciler.group_create(ctx, dir_group_id).await?;
                if let Some(dir_group) = self.reconciler.directory.get_group(dir_group_id).await? {
                    let pairs = [GroupAssignmentInput { idp_group_id: idp_group_id.clone(), dir_group }];
                    self.reconciler.groups_application_assignments(ctx, &pairs).await?;
                }
                self.reconciler.group_membership(ctx, dir_group_id, &idp_group_id).await?;
            }
            (Subject::Groups, BusAction::Update) => {
                let dir_group_id = msg.group_id.ok_or_else(missing_group_id)?;
                let idp_group_id = self.reconciler.group_update(ctx, dir_group_id).await?;
                if let Some(dir_group) = self.reconciler.directory.get_group(dir_group_id).await? {
                    let pairs = [GroupAssignmentInput { idp_group_id, dir_group }];
                    self.reconciler.groups_application_assignments(ctx, &pairs).await?;
                }
            }
            (Subject::Groups, BusAction::Delete) => {
                let dir_group_id = msg.group_id.ok_or_else(missing_group_id)?;
                self.reconciler.group_delete(ctx, dir_group_id).await?;
            }
            (Subject::Members, BusAction::Create) => {
                let dir_group_id = msg.group_id.ok_or_else(missing_group_id)?;
                let dir_user_id = msg.user_id.ok_or_else(missing_user_id)?;
                self.reconciler.group_membership_create(ctx, dir_group_id, dir_user_id).await?;
            }
            (Subject::Members, BusAction::Delete) => {
                let dir_group_id = msg.group_id.ok_or_else(missing_group_id)?;
                let dir_user_id = msg.user_id.ok_or_else(missing_user_id)?;
                self.reconciler.group_membership_delete(ctx, dir_group_id, dir_user_id).await?;
            }
            (Subject::Users, BusAction::Delete) => {
                let dir_user_id = msg.user_id.ok_or_else(missing_user_id)?;
                self.reconciler.user_delete(ctx, dir_user_id).await?;
            }
            (Subject::Users, BusAction::Update) => {
                let dir_user_id = msg.user_id.ok_or_else(missing_user_id)?;
                self.reconciler.user_update(ctx, dir_user_id).await?;
            }
            (subject, action) => {
                tracing::debug!(%subject, ?action, "unhandled (subject, action) pair, ignoring");
            }
        }
        Ok(())
    }
}

fn missing_group_id() -> Error {
    Error::Validation("bus message missing group_id after passing subject validation".into())
}

fn missing_user_id() -> Error {
    Error::Validation("bus message missing user_id after passing subject validation".into())
}

async fn run_subscriber(mut sub: async_nats::Subscriber, subject: Subject, consumer: EventConsumer, cancel: CancellationToken) {
    let queue_group = consumer.config.queue_group.clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            next = sub.next() => {
                let Some(message) = next else { return };
                consumer.dispatch(subject, &message.payload, &queue_group).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
