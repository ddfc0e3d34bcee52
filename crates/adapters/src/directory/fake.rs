// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

use std::sync::Arc;

use async_trait::async_trait;
use idp_sync_core::{
    DirGroup, DirGroupId, DirOrg, DirUser, DirUserId, IdpUserId, Result, UserStatus,
};
use parking_lot::Mutex;

use super::DirectoryAdapter;

struct State {
    groups: Vec<DirGroup>,
    orgs: Vec<DirOrg>,
    users: Vec<DirUser>,
}

/// In-memory `DirectoryAdapter` seeded with fixtures, used by engine/daemon
/// tests in place of the real REST client.
#[derive(Clone)]
pub struct FakeDirectoryAdapter {
    state: Arc<Mutex<State>>,
}

impl FakeDirectoryAdapter {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State { groups: Vec::new(), orgs: Vec::new(), users: Vec::new() })) }
    }

    pub fn with_groups(groups: Vec<DirGroup>) -> Self {
        let adapter = Self::new();
        adapter.state.lock().groups = groups;
        adapter
    }

    pub fn seed_group(&self, group: DirGroup) {
        self.state.lock().groups.push(group);
    }

    pub fn seed_org(&self, org: DirOrg) {
        self.state.lock().orgs.push(org);
    }

    pub fn seed_user(&self, user: DirUser) {
        self.state.lock().users.push(user);
    }

    pub fn replace_group(&self, group: DirGroup) {
        let mut state = self.state.lock();
        if let Some(existing) = state.groups.iter_mut().find(|g| g.id == group.id) {
            *existing = group;
        } else {
            state.groups.push(group);
        }
    }
}

impl Default for FakeDirectoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryAdapter for FakeDirectoryAdapter {
    async fn get_group(&self, id: DirGroupId) -> Result<Option<DirGroup>> {
        Ok(self.state.lock().groups.iter().find(|g| g.id == id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<DirGroup>> {
        Ok(self.state.lock().groups.clone())
    }

    async fn list_organizations(&self) -> Result<Vec<DirOrg>> {
        Ok(self.state.lock().orgs.clone())
    }

    async fn get_user(&self, id: DirUserId) -> Result<Option<DirUser>> {
        Ok(self.state.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self, include_deleted: bool) -> Result<Vec<DirUser>> {
        let state = self.state.lock();
        Ok(state
            .users
            .iter()
            .filter(|u| include_deleted || !u.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Vec<DirUser>> {
        Ok(self.state.lock().users.iter().filter(|u| u.email == email).cloned().collect())
    }

    async fn create_user(
        &self,
        email: String,
        name: String,
        external_id: IdpUserId,
        status: UserStatus,
    ) -> Result<DirUser> {
        let user = DirUser {
            id: DirUserId::new(),
            external_id: Some(external_id),
            email,
            name,
            status,
            deleted_at: None,
        };
        self.state.lock().users.push(user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: DirUserId,
        external_id: IdpUserId,
        name: String,
        status: UserStatus,
    ) -> Result<DirUser> {
        let mut state = self.state.lock();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| idp_sync_core::Error::Upstream(idp_sync_core::UpstreamError::NotFound {
                resource: "dir_user",
                id: id.to_string(),
            }))?;
        user.external_id = Some(external_id);
        user.name = name;
        user.status = status;
        Ok(user.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
