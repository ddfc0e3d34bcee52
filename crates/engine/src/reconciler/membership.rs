// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! group_membership / group_membership_create / group_membership_delete
//! (spec §4.3).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use idp_sync_core::{
    diff_sets, AuditOutcome, DirGroupId, DirUserId, Error, IdpGroupId, PreconditionError, Result,
    UserStatus,
};

use super::{AuditContext, Reconciler};

fn correlated(
    dir_group_id: DirGroupId,
    idp_group_id: &IdpGroupId,
    dir_user_id: Option<DirUserId>,
    idp_user_id: Option<&str>,
) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("dir_group_id".into(), dir_group_id.to_string());
    map.insert("idp_group_id".into(), idp_group_id.to_string());
    if let Some(id) = dir_user_id {
        map.insert("dir_user_id".into(), id.to_string());
    }
    if let Some(id) = idp_user_id {
        map.insert("idp_user_id".into(), id.to_string());
    }
    map
}

impl Reconciler {
    /// Converge the full membership set of one group (sweep path, or
    /// after a `groups` CREATE/UPDATE bus event — spec §4.1, §4.7).
    pub async fn group_membership(
        &self,
        ctx: &AuditContext,
        dir_group_id: DirGroupId,
        idp_group_id: &IdpGroupId,
    ) -> Result<()> {
        let group = self
            .directory
            .get_group(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_group",
                id: dir_group_id.to_string(),
            }))?;

        let idp_group = match self.idp.get_group(idp_group_id).await? {
            Some(idp_group) => idp_group,
            // Under dry-run, group_create may hand back a placeholder id for
            // a group that was never actually created (spec §8 law
            // "Dry-run"). There is nothing real to converge membership
            // against yet, so this is a benign no-op, not a failure.
            None if idp_group_id.as_str().starts_with(crate::reconciler::DRY_RUN_PLACEHOLDER_PREFIX) => {
                tracing::debug!(dir_group_id = %dir_group_id, "dry-run: group not yet created, skipping membership convergence");
                return Ok(());
            }
            None => {
                return Err(Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                    resource: "idp_group",
                    id: idp_group_id.to_string(),
                }))
            }
        };

        let mut desired = BTreeSet::new();
        for member_id in &group.members {
            let Some(user) = self.directory.get_user(*member_id).await? else { continue };
            if user.status == UserStatus::Pending {
                tracing::debug!(dir_user_id = %member_id, "skipping pending member, will settle on a later sweep");
                continue;
            }
            let Some(external_id) = user.external_id else {
                tracing::debug!(dir_user_id = %member_id, "skipping member with no external_id yet");
                continue;
            };
            desired.insert(external_id);
        }

        let diff = diff_sets(&desired, &idp_group.members);

        for idp_user_id in &diff.to_add {
            let outcome = if self.policy.dry_run {
                AuditOutcome::Succeeded
            } else {
                match self.idp.add_group_member(idp_group_id, idp_user_id).await {
                    Ok(()) => {
                        if self.should_count() {
                            crate::metrics::Counters::incr(&self.metrics.group_membership_created);
                        }
                        AuditOutcome::Succeeded
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, idp_group_id = %idp_group_id, idp_user_id = %idp_user_id, "failed to add group member");
                        AuditOutcome::Failed
                    }
                }
            };
            self.emit_audit(
                ctx,
                "GroupMemberAdd",
                outcome,
                correlated(dir_group_id, idp_group_id, None, Some(idp_user_id.as_str())),
            )
            .await;
        }

        if !self.policy.skip_delete {
            for idp_user_id in &diff.to_remove {
                let outcome = if self.policy.dry_run {
                    AuditOutcome::Succeeded
                } else {
                    match self.idp.remove_group_member(idp_group_id, idp_user_id).await {
                        Ok(()) => {
                            if self.should_count() {
                                crate::metrics::Counters::incr(&self.metrics.group_membership_deleted);
                            }
                            AuditOutcome::Succeeded
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, idp_group_id = %idp_group_id, idp_user_id = %idp_user_id, "failed to remove group member");
                            AuditOutcome::Failed
                        }
                    }
                };
                self.emit_audit(
                    ctx,
                    "GroupMemberRemove",
                    outcome,
                    correlated(dir_group_id, idp_group_id, None, Some(idp_user_id.as_str())),
                )
                .await;
            }
        }

        Ok(())
    }

    /// Event-driven add of a single member (`members` subject, CREATE).
    pub async fn group_membership_create(
        &self,
        ctx: &AuditContext,
        dir_group_id: DirGroupId,
        dir_user_id: DirUserId,
    ) -> Result<()> {
        let result = self.group_membership_create_inner(dir_group_id, dir_user_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        if let Ok(idp_group_id) = &result {
            self.emit_audit(ctx, "GroupMemberAdd", outcome, correlated(dir_group_id, idp_group_id, Some(dir_user_id), None))
                .await;
            if self.should_count() {
                crate::metrics::Counters::incr(&self.metrics.group_membership_created);
            }
        }
        result.map(|_| ())
    }

    async fn group_membership_create_inner(&self, dir_group_id: DirGroupId, dir_user_id: DirUserId) -> Result<IdpGroupId> {
        let group = self
            .directory
            .get_group(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_group",
                id: dir_group_id.to_string(),
            }))?;
        if !group.members.contains(&dir_user_id) {
            return Err(Error::Precondition(PreconditionError::NotPresent));
        }

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

        let idp_group = self
            .idp
            .find_group_by_directory_id(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "idp_group",
                id: dir_group_id.to_string(),
            }))?;

        if !self.policy.dry_run {
            self.idp.add_group_member(&idp_group.id, &external_id).await?;
        }
        Ok(idp_group.id)
    }

    /// Event-driven removal of a single member (`members` subject, DELETE).
    pub async fn group_membership_delete(
        &self,
        ctx: &AuditContext,
        dir_group_id: DirGroupId,
        dir_user_id: DirUserId,
    ) -> Result<()> {
        let result = self.group_membership_delete_inner(dir_group_id, dir_user_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        if let Ok(idp_group_id) = &result {
            self.emit_audit(ctx, "GroupMemberRemove", outcome, correlated(dir_group_id, idp_group_id, Some(dir_user_id), None))
                .await;
            if self.should_count() {
                crate::metrics::Counters::incr(&self.metrics.group_membership_deleted);
            }
        }
        result.map(|_| ())
    }

    async fn group_membership_delete_inner(&self, dir_group_id: DirGroupId, dir_user_id: DirUserId) -> Result<IdpGroupId> {
        let group = self
            .directory
            .get_group(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_group",
                id: dir_group_id.to_string(),
            }))?;
        if group.members.contains(&dir_user_id) {
            return Err(Error::Precondition(PreconditionError::StillPresent));
        }

        let user = self.directory.get_user(dir_user_id).await?;
        let Some(external_id) = user.and_then(|u| u.external_id) else {
            // No known IdP identity to remove — nothing to do, but still a
            // successful convergence of desired state.
            let idp_group = self
                .idp
                .find_group_by_directory_id(dir_group_id)
                .await?
                .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                    resource: "idp_group",
                    id: dir_group_id.to_string(),
                }))?;
            return Ok(idp_group.id);
        };

        let idp_group = self
            .idp
            .find_group_by_directory_id(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "idp_group",
                id: dir_group_id.to_string(),
            }))?;

        if !self.policy.skip_delete && !self.policy.dry_run {
            self.idp.remove_group_member(&idp_group.id, &external_id).await?;
        }
        Ok(idp_group.id)
    }
}

#[cfg(test)]
#[path = "membership_tests.rs"]
mod tests;
