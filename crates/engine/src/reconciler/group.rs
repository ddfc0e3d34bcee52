// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! group_create / group_update / group_delete (spec §4.2).

use std::collections::BTreeMap;

use idp_sync_core::{
    AuditOutcome, DirGroupId, Error, IdpGroupId, IdpGroupProfile, Result, UpstreamError,
};

use super::{AuditContext, Reconciler};

/// Marker prefix for the placeholder id `group_create` returns under
/// `dry_run` when no IdP group exists yet to report a real id for.
pub const DRY_RUN_PLACEHOLDER_PREFIX: &str = "dry-run-no-such-group:";

fn correlated(dir_group_id: DirGroupId, idp_group_id: Option<&IdpGroupId>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("dir_group_id".into(), dir_group_id.to_string());
    if let Some(id) = idp_group_id {
        map.insert("idp_group_id".into(), id.to_string());
    }
    map
}

impl Reconciler {
    pub async fn group_create(&self, ctx: &AuditContext, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let result = self.group_create_inner(dir_group_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        self.emit_audit(ctx, "GroupCreate", outcome, correlated(dir_group_id, result.as_ref().ok())).await;
        if result.is_ok() && self.should_count() {
            crate::metrics::Counters::incr(&self.metrics.groups_created);
        }
        result
    }

    async fn group_create_inner(&self, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let group = self
            .directory
            .get_group(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "dir_group", id: dir_group_id.to_string() }))?;

        let mut profile = IdpGroupProfile { name: group.name, description: group.description, ..Default::default() };
        profile.set_directory_id(dir_group_id);

        if self.policy.dry_run {
            // Nothing was created; if a prior (non-dry-run) run already
            // created this group, report its real id so downstream dry-run
            // steps still converge against something real. Otherwise there
            // is no IdP group to report — return a placeholder carrying the
            // `DRY_RUN_PLACEHOLDER_PREFIX` marker so `group_membership` and
            // `groups_application_assignments` can recognize it and skip
            // their own mutations without treating it as a real failure.
            if let Some(existing) = self.idp.find_group_by_directory_id(dir_group_id).await? {
                return Ok(existing.id);
            }
            return Ok(IdpGroupId::from(format!("{DRY_RUN_PLACEHOLDER_PREFIX}{dir_group_id}")));
        }

        match self.idp.create_group(profile).await {
            Ok(created) => Ok(created.id),
            // Create-if-missing is idempotent: a conflicting directory_id
            // means another writer already created it first (sweep, or a
            // racing replica). Treat that as success, not failure.
            Err(Error::Upstream(UpstreamError::Conflict { .. })) => self
                .idp
                .find_group_by_directory_id(dir_group_id)
                .await?
                .map(|g| g.id)
                .ok_or_else(|| Error::Upstream(UpstreamError::Conflict { resource: "idp_group", id: dir_group_id.to_string() })),
            Err(e) => Err(e),
        }
    }

    pub async fn group_update(&self, ctx: &AuditContext, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let result = self.group_update_inner(dir_group_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        self.emit_audit(ctx, "GroupUpdate", outcome, correlated(dir_group_id, result.as_ref().ok())).await;
        if result.is_ok() && self.should_count() {
            crate::metrics::Counters::incr(&self.metrics.groups_updated);
        }
        result
    }

    async fn group_update_inner(&self, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let group = self
            .directory
            .get_group(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "dir_group", id: dir_group_id.to_string() }))?;

        let idp_group = self
            .idp
            .find_group_by_directory_id(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: dir_group_id.to_string() }))?;

        let mut profile = idp_group.profile;
        profile.name = group.name;
        profile.description = group.description;
        // Re-assert on every update: some IdPs allow profile overwrites that
        // drop unknown extended keys.
        profile.set_directory_id(dir_group_id);

        if !self.policy.dry_run {
            self.idp.update_group_profile(&idp_group.id, profile).await?;
        }
        Ok(idp_group.id)
    }

    pub async fn group_delete(&self, ctx: &AuditContext, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let result = self.group_delete_inner(dir_group_id).await;
        let outcome = if result.is_ok() { AuditOutcome::Succeeded } else { AuditOutcome::Failed };
        self.emit_audit(ctx, "GroupDelete", outcome, correlated(dir_group_id, result.as_ref().ok())).await;
        if result.is_ok() && self.should_count() {
            crate::metrics::Counters::incr(&self.metrics.groups_deleted);
        }
        result
    }

    async fn group_delete_inner(&self, dir_group_id: DirGroupId) -> Result<IdpGroupId> {
        let idp_group = self
            .idp
            .find_group_by_directory_id(dir_group_id)
            .await?
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: dir_group_id.to_string() }))?;

        if self.policy.skip_delete {
            return Ok(idp_group.id);
        }
        if self.policy.dry_run {
            return Ok(idp_group.id);
        }
        self.idp.delete_group(&idp_group.id).await?;
        Ok(idp_group.id)
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
