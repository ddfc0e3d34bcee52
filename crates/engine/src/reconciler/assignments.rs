// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! groups_application_assignments (spec §4.4).
//!
//! The "list once per application" discipline is the entire reason this is
//! its own operation rather than folded into `group_membership`: with N
//! applications and M groups the call budget is `2N + 2` regardless of M
//! (spec §8 law "Rate-budget").

use std::collections::{BTreeMap, BTreeSet};

use idp_sync_core::{AuditOutcome, DirGroup, IdpGroupId, Result};

use super::{AuditContext, Reconciler};

/// One `(idp_group_id, DirGroup)` pair built by the sweep while walking
/// groups (spec §4.1 step 2).
#[derive(Debug, Clone)]
pub struct GroupAssignmentInput {
    pub idp_group_id: IdpGroupId,
    pub dir_group: DirGroup,
}

impl Reconciler {
    pub async fn groups_application_assignments(
        &self,
        ctx: &AuditContext,
        pairs: &[GroupAssignmentInput],
    ) -> Result<()> {
        let applications = self.idp.list_applications().await?;
        let orgs = self.directory.list_organizations().await?;
        let known_org_slugs: BTreeSet<&str> = orgs.iter().map(|o| o.slug.as_str()).collect();
        let org_id_to_slug: BTreeMap<_, _> = orgs.iter().map(|o| (o.id, o.slug.as_str())).collect();

        for app in &applications {
            let assignments: BTreeSet<IdpGroupId> =
                self.idp.list_application_group_assignments(&app.id).await?.into_iter().collect();

            for pair in pairs {
                let group_org_slugs: BTreeSet<&str> = pair
                    .dir_group
                    .organizations
                    .iter()
                    .filter_map(|id| org_id_to_slug.get(id).copied())
                    .collect();

                let org_matches = known_org_slugs.contains(app.external_org_slug.as_str())
                    && group_org_slugs.contains(app.external_org_slug.as_str());
                let is_assigned = assignments.contains(&pair.idp_group_id);

                // Under dry-run, group_create may have handed back a
                // placeholder id for a group that was never actually
                // created (spec §8 law "Dry-run") — nothing real to
                // assign against yet.
                let is_placeholder =
                    pair.idp_group_id.as_str().starts_with(super::DRY_RUN_PLACEHOLDER_PREFIX);

                if org_matches && !is_assigned && !is_placeholder {
                    let outcome = if self.policy.dry_run {
                        AuditOutcome::Succeeded
                    } else {
                        match self.idp.assign_application_group(&app.id, &pair.idp_group_id).await {
                            Ok(()) => {
                                if self.should_count() {
                                    crate::metrics::Counters::incr(&self.metrics.groups_application_assigned);
                                }
                                AuditOutcome::Succeeded
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, app_id = %app.id, idp_group_id = %pair.idp_group_id, "failed to assign application group");
                                AuditOutcome::Failed
                            }
                        }
                    };
                    self.emit_audit(ctx, "GroupApplicationAssign", outcome, correlated(app, &pair.idp_group_id)).await;
                } else if !org_matches && is_assigned && !self.policy.skip_delete {
                    let outcome = if self.policy.dry_run {
                        AuditOutcome::Succeeded
                    } else {
                        match self.idp.unassign_application_group(&app.id, &pair.idp_group_id).await {
                            Ok(()) => {
                                if self.should_count() {
                                    crate::metrics::Counters::incr(&self.metrics.groups_application_unassigned);
                                }
                                AuditOutcome::Succeeded
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, app_id = %app.id, idp_group_id = %pair.idp_group_id, "failed to unassign application group");
                                AuditOutcome::Failed
                            }
                        }
                    };
                    self.emit_audit(ctx, "GroupApplicationUnassign", outcome, correlated(app, &pair.idp_group_id)).await;
                }
            }
        }

        Ok(())
    }
}

fn correlated(app: &idp_sync_core::IdpApplication, idp_group_id: &IdpGroupId) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("idp_application_id".into(), app.id.to_string());
    map.insert("idp_group_id".into(), idp_group_id.to_string());
    map
}

#[cfg(test)]
#[path = "assignments_tests.rs"]
mod tests;
