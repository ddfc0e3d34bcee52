// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Authenticated client surface for the Directory REST API (spec §6).

mod http;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use http::{DirectoryConfig, HttpDirectoryAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDirectoryAdapter;

use async_trait::async_trait;
use idp_sync_core::{DirGroup, DirGroupId, DirOrg, DirUser, DirUserId, Result};
use thiserror::Error;

/// Errors raised while talking to the Directory, before they are folded into
/// `idp_sync_core::Error` at the trait boundary.
#[derive(Debug, Error)]
pub enum DirectoryAdapterError {
    #[error("directory http request failed: {0}")]
    Http(String),

    #[error("failed to decode directory response: {0}")]
    Decode(String),

    #[error("directory token refresh failed: {0}")]
    Auth(String),

    #[error("directory returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Read surface the reconciler needs against the Directory.
///
/// The Directory is authoritative for everything it owns; this adapter never
/// mutates Directory state, only the IdP's (see `IdpAdapter`).
#[async_trait]
pub trait DirectoryAdapter: Send + Sync + 'static {
    async fn get_group(&self, id: DirGroupId) -> Result<Option<DirGroup>>;

    async fn list_groups(&self) -> Result<Vec<DirGroup>>;

    async fn list_organizations(&self) -> Result<Vec<DirOrg>>;

    async fn get_user(&self, id: DirUserId) -> Result<Option<DirUser>>;

    /// List users, optionally including soft-deleted ones (`deleted=true`
    /// query parameter per spec §6) — the sweep needs tombstones to drive
    /// `user_delete`.
    async fn list_users(&self, include_deleted: bool) -> Result<Vec<DirUser>>;

    /// Find a user by email; used by the event-log poller to match an IdP
    /// user back to a Directory record.
    async fn find_user_by_email(&self, email: &str) -> Result<Vec<DirUser>>;

    /// Create a Directory user (used by the event-log poller for
    /// `user.lifecycle.create`, not by the reconciler proper).
    async fn create_user(
        &self,
        email: String,
        name: String,
        external_id: idp_sync_core::IdpUserId,
        status: idp_sync_core::UserStatus,
    ) -> Result<DirUser>;

    /// Overwrite a user's `external_id`/`name`/`status`, used by the
    /// event-log poller to settle a pending Directory user.
    async fn update_user(
        &self,
        id: DirUserId,
        external_id: idp_sync_core::IdpUserId,
        name: String,
        status: idp_sync_core::UserStatus,
    ) -> Result<DirUser>;
}
