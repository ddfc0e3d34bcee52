// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! user_delete / user_update (spec §4.5).

use std::collections::BTreeMap;

use idp_sync_core::{
    AuditOutcome, DirUserId, Error, IdpUserId, IdpUserStatus, PreconditionError, Result, UserStatus,
};

use super::{AuditContext, Reconciler};

fn correlated(dir_user_id: DirUserId, idp_user_id: Option<&IdpUserId>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("dir_user_id".into(), dir_user_id.to_string());
    if let Some(id) = idp_user_id {
        map.insert("idp_user_id".into(), id.to_string());
    }
    map
}

impl Reconciler {
    pub async fn user_delete(&self, ctx: &AuditContext, dir_user_id: DirUserId) -> Result<IdpUserId> {
        let result = self.user_delete_inner(dir_user_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        self.emit_audit(ctx, "UserDelete", outcome, correlated(dir_user_id, result.as_ref().ok())).await;
        if result.is_ok() && self.should_count() {
            crate::metrics::Counters::incr(&self.metrics.users_deleted);
        }
        result
    }

    async fn user_delete_inner(&self, dir_user_id: DirUserId) -> Result<IdpUserId> {
        let user = self
            .directory
            .get_user(dir_user_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_user",
                id: dir_user_id.to_string(),
            }))?;

        if !idp_sync_core::user_deleted(&user, self.clock.now(), self.policy.deletion_cutoff) {
            return Err(Error::Precondition(PreconditionError::StillExists));
        }

        let idp_user = self
            .idp
            .find_user_by_email(&user.email)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "idp_user",
                id: user.email.clone(),
            }))?;

        if self.policy.dry_run {
            return Ok(idp_user.id);
        }

        // Each step's failure is logged but does not abort the next: the
        // IdP may already be in the desired state for an earlier step.
        if let Err(e) = self.idp.deactivate_user(&idp_user.id).await {
            tracing::warn!(error = %e, idp_user_id = %idp_user.id, "failed to deactivate idp user during delete");
        }
        if let Err(e) = self.idp.clear_user_sessions(&idp_user.id).await {
            tracing::warn!(error = %e, idp_user_id = %idp_user.id, "failed to clear idp sessions during delete");
        }
        if !self.policy.skip_delete {
            self.idp.delete_user(&idp_user.id).await?;
        }
        Ok(idp_user.id)
    }

    pub async fn user_update(&self, ctx: &AuditContext, dir_user_id: DirUserId) -> Result<IdpUserId> {
        let result = self.user_update_inner(dir_user_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        self.emit_audit(ctx, "UserUpdate", outcome, correlated(dir_user_id, result.as_ref().ok())).await;
        if result.is_ok() && self.should_count() {
            crate::metrics::Counters::incr(&self.metrics.users_updated);
        }
        result
    }

    async fn user_update_inner(&self, dir_user_id: DirUserId) -> Result<IdpUserId> {
        let user = self
            .directory
            .get_user(dir_user_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_user",
                id: dir_user_id.to_string(),
            }))?;

        if user.status == UserStatus::Pending {
            return Err(Error::Precondition(PreconditionError::PendingUser));
        }
        let external_id = user.external_id.ok_or(Error::Precondition(PreconditionError::PendingUser))?;

        let idp_user = self
            .idp
            .get_user(&external_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "idp_user",
                id: external_id.to_string(),
            }))?;

        // The IdP owns any transition outside these two states (e.g.
        // deprovisioned) — leave it alone.
        if !matches!(idp_user.status, IdpUserStatus::Active | IdpUserStatus::Suspended) {
            return Ok(idp_user.id);
        }

        if self.policy.dry_run {
            return Ok(idp_user.id);
        }

        match (user.status, idp_user.status) {
            (UserStatus::Suspended, IdpUserStatus::Active) => {
                self.idp.suspend_user(&idp_user.id).await?;
            }
            (UserStatus::Active, IdpUserStatus::Suspended) => {
                self.idp.unsuspend_user(&idp_user.id).await?;
            }
            _ => {}
        }

        Ok(idp_user.id)
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
