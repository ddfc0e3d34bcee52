// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Entities reconciled between the Directory and the IdP.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{DirGroupId, DirOrgId, DirUserId, IdpApplicationId, IdpGroupId, IdpUserId};

/// Key used in `IdpGroup.profile.extended` to carry the owning `DirGroupId`.
pub const DIRECTORY_ID_KEY: &str = "directory_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Pending,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirUser {
    pub id: DirUserId,
    /// Set once an IdP user has been matched to this Directory user; never
    /// changes after being set (see invariant in the data model).
    pub external_id: Option<IdpUserId>,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DirUser {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirGroup {
    pub id: DirGroupId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub organizations: BTreeSet<DirOrgId>,
    pub members: BTreeSet<DirUserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirOrg {
    pub id: DirOrgId,
    pub slug: String,
    pub name: String,
}

/// Schema-extensible profile map carried by an `IdpGroup`.
///
/// `directory_id` is the one key this controller ever reads or writes; the
/// rest of the map is opaque passthrough so the IdP's own UI/other tooling
/// can keep arbitrary metadata on the group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpGroupProfile {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub extended: BTreeMap<String, serde_json::Value>,
}

impl IdpGroupProfile {
    /// Read `extended[directory_id]` as a `DirGroupId`.
    ///
    /// Returns `Ok(None)` if the key is absent, and `Err` if present but not
    /// a string or not a valid UUID — per the design note, non-string
    /// profile values must surface as `Validation` errors, never panic.
    pub fn directory_id(&self) -> Result<Option<DirGroupId>, crate::error::Error> {
        match self.extended.get(DIRECTORY_ID_KEY) {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => DirGroupId::parse(s)
                .map(Some)
                .map_err(|e| crate::error::Error::Validation(format!("invalid directory_id: {e}"))),
            Some(other) => Err(crate::error::Error::Validation(format!(
                "directory_id profile value must be a string, got {other}"
            ))),
        }
    }

    pub fn set_directory_id(&mut self, id: DirGroupId) {
        self.extended.insert(DIRECTORY_ID_KEY.to_string(), serde_json::Value::String(id.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpGroup {
    pub id: IdpGroupId,
    pub profile: IdpGroupProfile,
    pub members: BTreeSet<IdpUserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdpUserStatus {
    Active,
    Suspended,
    Deprovisioned,
    Provisioned,
    StagedForDeletion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpUser {
    pub id: IdpUserId,
    pub email: String,
    pub status: IdpUserStatus,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpApplication {
    pub id: IdpApplicationId,
    pub name: String,
    /// The Directory org slug this application instance is bound to
    /// (`settings.app.externalOrg` in the IdP's own schema).
    pub external_org_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogTarget {
    #[serde(rename = "type")]
    pub target_type: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    pub published: DateTime<Utc>,
    pub target: Vec<EventLogTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

/// Where a reconciler operation was triggered from, for audit correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSource {
    /// Triggered by a bus message.
    Bus { subject: String, queue_group: String },
    /// Triggered by the periodic full sweep.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: String,
    pub event_type: String,
    pub source: AuditSource,
    pub outcome: AuditOutcome,
    pub correlated_ids: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
