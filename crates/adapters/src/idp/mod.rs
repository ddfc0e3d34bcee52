// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Client surface for the external IdP's management API (spec §6).

mod http;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use http::{HttpIdpAdapter, IdpConfig};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeIdpAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_sync_core::{
    EventLogEntry, IdpApplication, IdpApplicationId, IdpGroup, IdpGroupId, IdpGroupProfile,
    IdpUser, IdpUserId, Result,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdpAdapterError {
    #[error("idp http request failed: {0}")]
    Http(String),

    #[error("failed to decode idp response: {0}")]
    Decode(String),

    #[error("idp returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Full client surface the reconciler and event-log poller are built
/// against. All list operations exhaust pagination internally (spec §9) —
/// callers never see a page cursor.
#[async_trait]
pub trait IdpAdapter: Send + Sync + 'static {
    async fn create_group(&self, profile: IdpGroupProfile) -> Result<IdpGroup>;
    async fn get_group(&self, id: &IdpGroupId) -> Result<Option<IdpGroup>>;
    /// Find the one group (if any) carrying this `directory_id` in its
    /// profile's extended map.
    async fn find_group_by_directory_id(
        &self,
        directory_id: idp_sync_core::DirGroupId,
    ) -> Result<Option<IdpGroup>>;
    async fn update_group_profile(&self, id: &IdpGroupId, profile: IdpGroupProfile) -> Result<()>;
    async fn delete_group(&self, id: &IdpGroupId) -> Result<()>;

    async fn add_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()>;
    async fn remove_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()>;

    async fn get_user(&self, id: &IdpUserId) -> Result<Option<IdpUser>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdpUser>>;
    async fn list_users(&self) -> Result<Vec<IdpUser>>;
    async fn deactivate_user(&self, id: &IdpUserId) -> Result<()>;
    async fn clear_user_sessions(&self, id: &IdpUserId) -> Result<()>;
    async fn suspend_user(&self, id: &IdpUserId) -> Result<()>;
    async fn unsuspend_user(&self, id: &IdpUserId) -> Result<()>;
    async fn delete_user(&self, id: &IdpUserId) -> Result<()>;

    /// Applications of the configured type filter (spec §3).
    async fn list_applications(&self) -> Result<Vec<IdpApplication>>;
    /// Groups currently assigned to an application — exactly one call per
    /// application, never per `(app, group)` pair (spec §4.4, §5).
    async fn list_application_group_assignments(
        &self,
        app_id: &IdpApplicationId,
    ) -> Result<Vec<IdpGroupId>>;
    async fn assign_application_group(
        &self,
        app_id: &IdpApplicationId,
        group_id: &IdpGroupId,
    ) -> Result<()>;
    async fn unassign_application_group(
        &self,
        app_id: &IdpApplicationId,
        group_id: &IdpGroupId,
    ) -> Result<()>;

    /// Bounded event-log query used by the poller (spec §4.6). Both ends
    /// must be supplied; a single-ended query puts the upstream SDK into a
    /// different polling mode.
    async fn get_logs_bounded(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventLogEntry>>;
}
