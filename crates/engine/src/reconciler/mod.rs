// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Stateless orchestrator driving the IdP to match the Directory.
//!
//! Holds references to both adapters, the audit sink, the leader lock and
//! policy flags; exposes the per-entity operations dispatched by the bus
//! consumer (spec §4.2-§4.5) and the periodic full sweep (spec §4.1).

mod assignments;
mod group;
mod membership;
mod sweep;
mod user;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use idp_sync_adapters::{AuditSink, DirectoryAdapter, IdpAdapter, LeaderLock};
use idp_sync_core::{AuditId, AuditOutcome, AuditRecord, AuditSource, Clock};

use crate::metrics::Counters;

/// Where a single reconciler call was triggered from — threaded through to
/// every audit record it emits (spec §4.7, §4.8).
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub audit_id: String,
    pub source: AuditSource,
}

impl AuditContext {
    /// Sweep-triggered operations have no upstream event to correlate
    /// against, so they mint a fresh id (spec §8 invariant 5).
    pub fn sweep() -> Self {
        Self { audit_id: AuditId::generate().to_string(), source: AuditSource::Sweep }
    }

    pub fn bus(audit_id: String, subject: String, queue_group: String) -> Self {
        Self { audit_id, source: AuditSource::Bus { subject, queue_group } }
    }
}

/// Policy flags loaded from configuration (spec §3, §4.10).
#[derive(Debug, Clone)]
pub struct ReconcilerPolicy {
    pub dry_run: bool,
    pub skip_delete: bool,
    pub deletion_cutoff: ChronoDuration,
    /// Restrict the sweep to Directory groups whose slug starts with this
    /// prefix (CLI/config `--selector-prefix`). `None` sweeps everything.
    pub selector_prefix: Option<String>,
}

impl Default for ReconcilerPolicy {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_delete: false,
            deletion_cutoff: idp_sync_core::policy::DEFAULT_DELETION_CUTOFF,
            selector_prefix: None,
        }
    }
}

pub struct Reconciler {
    pub(crate) directory: Arc<dyn DirectoryAdapter>,
    pub(crate) idp: Arc<dyn IdpAdapter>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) lock: Arc<dyn LeaderLock>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<Counters>,
    pub(crate) policy: ReconcilerPolicy,
}

impl Reconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn DirectoryAdapter>,
        idp: Arc<dyn IdpAdapter>,
        audit: Arc<dyn AuditSink>,
        lock: Arc<dyn LeaderLock>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Counters>,
        policy: ReconcilerPolicy,
    ) -> Self {
        Self { directory, idp, audit, lock, clock, metrics, policy }
    }

    /// Emit exactly one audit record for a mutation attempt (spec §8
    /// invariant 5). `dry_run` suppresses both the record and the counter
    /// (spec §8 law "Dry-run").
    pub(crate) async fn emit_audit(
        &self,
        ctx: &AuditContext,
        event_type: &str,
        outcome: AuditOutcome,
        correlated_ids: BTreeMap<String, String>,
    ) {
        if self.policy.dry_run {
            return;
        }
        let record = AuditRecord {
            audit_id: ctx.audit_id.clone(),
            event_type: event_type.to_string(),
            source: ctx.source.clone(),
            outcome,
            correlated_ids,
        };
        if let Err(e) = self.audit.record(record).await {
            tracing::warn!(error = %e, event_type, "failed to write audit record");
        }
    }

    /// Counters are suppressed under dry-run, same as audit records (spec §8
    /// law "Dry-run").
    pub(crate) fn should_count(&self) -> bool {
        !self.policy.dry_run
    }
}

pub use assignments::GroupAssignmentInput;
pub use group::DRY_RUN_PLACEHOLDER_PREFIX;
pub use sweep::SweepReport;
