// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_sync_core::{
    DirGroupId, Error, EventLogEntry, IdpApplication, IdpApplicationId, IdpGroup, IdpGroupId,
    IdpGroupProfile, IdpUser, IdpUserId, IdpUserStatus, Result, UpstreamError,
};
use parking_lot::Mutex;

use super::IdpAdapter;

#[derive(Default)]
struct State {
    groups: BTreeMap<String, IdpGroup>,
    users: BTreeMap<String, IdpUser>,
    applications: Vec<IdpApplication>,
    /// app_id -> assigned group ids
    assignments: BTreeMap<String, BTreeSet<String>>,
    events: Vec<EventLogEntry>,
    calls: Vec<String>,
    next_group_seq: u64,
}

/// In-memory `IdpAdapter`. Records every mutating call name in order so
/// tests can assert the rate-budget law (spec §8) without instrumenting a
/// mock HTTP server.
#[derive(Clone)]
pub struct FakeIdpAdapter {
    state: Arc<Mutex<State>>,
}

impl FakeIdpAdapter {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State::default())) }
    }

    pub fn seed_group(&self, group: IdpGroup) {
        self.state.lock().groups.insert(group.id.as_str().to_string(), group);
    }

    pub fn seed_user(&self, user: IdpUser) {
        self.state.lock().users.insert(user.id.as_str().to_string(), user);
    }

    pub fn seed_application(&self, app: IdpApplication, assigned_groups: &[IdpGroupId]) {
        let mut state = self.state.lock();
        state
            .assignments
            .insert(app.id.as_str().to_string(), assigned_groups.iter().map(|g| g.as_str().to_string()).collect());
        state.applications.push(app);
    }

    pub fn seed_event(&self, event: EventLogEntry) {
        self.state.lock().events.push(event);
    }

    /// Every mutating call recorded, in order, e.g. `"create_group"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn group(&self, id: &IdpGroupId) -> Option<IdpGroup> {
        self.state.lock().groups.get(id.as_str()).cloned()
    }

    pub fn assignments(&self, app_id: &IdpApplicationId) -> BTreeSet<String> {
        self.state.lock().assignments.get(app_id.as_str()).cloned().unwrap_or_default()
    }
}

impl Default for FakeIdpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdpAdapter for FakeIdpAdapter {
    async fn create_group(&self, profile: IdpGroupProfile) -> Result<IdpGroup> {
        let mut state = self.state.lock();
        if let Some(directory_id) = profile.directory_id()? {
            if state.groups.values().any(|g| g.profile.directory_id().ok().flatten() == Some(directory_id)) {
                return Err(Error::Upstream(UpstreamError::Conflict {
                    resource: "idp_group",
                    id: directory_id.to_string(),
                }));
            }
        }
        state.next_group_seq += 1;
        let id = IdpGroupId::from(format!("idp_group_{}", state.next_group_seq));
        let group = IdpGroup { id: id.clone(), profile, members: BTreeSet::new() };
        state.groups.insert(id.as_str().to_string(), group.clone());
        state.calls.push("create_group".into());
        Ok(group)
    }

    async fn get_group(&self, id: &IdpGroupId) -> Result<Option<IdpGroup>> {
        Ok(self.state.lock().groups.get(id.as_str()).cloned())
    }

    async fn find_group_by_directory_id(&self, directory_id: DirGroupId) -> Result<Option<IdpGroup>> {
        let state = self.state.lock();
        for group in state.groups.values() {
            if group.profile.directory_id()? == Some(directory_id) {
                return Ok(Some(group.clone()));
            }
        }
        Ok(None)
    }

    async fn update_group_profile(&self, id: &IdpGroupId, profile: IdpGroupProfile) -> Result<()> {
        let mut state = self.state.lock();
        let group = state
            .groups
            .get_mut(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: id.to_string() }))?;
        group.profile = profile;
        state.calls.push("update_group_profile".into());
        Ok(())
    }

    async fn delete_group(&self, id: &IdpGroupId) -> Result<()> {
        let mut state = self.state.lock();
        state
            .groups
            .remove(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: id.to_string() }))?;
        state.calls.push("delete_group".into());
        Ok(())
    }

    async fn add_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        let group = state.groups.get_mut(group_id.as_str()).ok_or_else(|| {
            Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: group_id.to_string() })
        })?;
        group.members.insert(user_id.clone());
        state.calls.push("add_group_member".into());
        Ok(())
    }

    async fn remove_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        let group = state.groups.get_mut(group_id.as_str()).ok_or_else(|| {
            Error::Upstream(UpstreamError::NotFound { resource: "idp_group", id: group_id.to_string() })
        })?;
        group.members.remove(user_id);
        state.calls.push("remove_group_member".into());
        Ok(())
    }

    async fn get_user(&self, id: &IdpUserId) -> Result<Option<IdpUser>> {
        Ok(self.state.lock().users.get(id.as_str()).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdpUser>> {
        Ok(self.state.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<IdpUser>> {
        Ok(self.state.lock().users.values().cloned().collect())
    }

    async fn deactivate_user(&self, id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        let user = state
            .users
            .get_mut(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_user", id: id.to_string() }))?;
        user.status = IdpUserStatus::Deprovisioned;
        state.calls.push("deactivate_user".into());
        Ok(())
    }

    async fn clear_user_sessions(&self, id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        state
            .users
            .get(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_user", id: id.to_string() }))?;
        state.calls.push("clear_user_sessions".into());
        Ok(())
    }

    async fn suspend_user(&self, id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        let user = state
            .users
            .get_mut(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_user", id: id.to_string() }))?;
        user.status = IdpUserStatus::Suspended;
        state.calls.push("suspend_user".into());
        Ok(())
    }

    async fn unsuspend_user(&self, id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        let user = state
            .users
            .get_mut(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_user", id: id.to_string() }))?;
        user.status = IdpUserStatus::Active;
        state.calls.push("unsuspend_user".into());
        Ok(())
    }

    async fn delete_user(&self, id: &IdpUserId) -> Result<()> {
        let mut state = self.state.lock();
        state
            .users
            .remove(id.as_str())
            .ok_or_else(|| Error::Upstream(UpstreamError::NotFound { resource: "idp_user", id: id.to_string() }))?;
        state.calls.push("delete_user".into());
        Ok(())
    }

    async fn list_applications(&self) -> Result<Vec<IdpApplication>> {
        let mut state = self.state.lock();
        state.calls.push("list_applications".into());
        Ok(state.applications.clone())
    }

    async fn list_application_group_assignments(&self, app_id: &IdpApplicationId) -> Result<Vec<IdpGroupId>> {
        let mut state = self.state.lock();
        state.calls.push("list_application_group_assignments".into());
        Ok(state
            .assignments
            .get(app_id.as_str())
            .map(|set| set.iter().cloned().map(IdpGroupId::from).collect())
            .unwrap_or_default())
    }

    async fn assign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        let mut state = self.state.lock();
        state.assignments.entry(app_id.as_str().to_string()).or_default().insert(group_id.as_str().to_string());
        state.calls.push("assign_application_group".into());
        Ok(())
    }

    async fn unassign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        let mut state = self.state.lock();
        state.assignments.entry(app_id.as_str().to_string()).or_default().remove(group_id.as_str());
        state.calls.push("unassign_application_group".into());
        Ok(())
    }

    async fn get_logs_bounded(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<EventLogEntry>> {
        let state = self.state.lock();
        Ok(state.events.iter().filter(|e| e.published >= since && e.published < until).cloned().collect())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
