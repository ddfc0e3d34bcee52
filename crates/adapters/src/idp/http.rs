// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! `reqwest`-backed `IdpAdapter`. Auth is a static bearer token (the IdP's
//! management API uses long-lived API tokens, unlike the Directory's
//! client-credentials flow), so there is no token endpoint to refresh
//! against — a 401 still gets one same-token retry before being mapped to
//! `UpstreamError::Unauthorized` (spec §7/§9).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_sync_core::{
    DirGroupId, Error, EventLogEntry, IdpApplication, IdpApplicationId, IdpGroup, IdpGroupId,
    IdpGroupProfile, IdpUser, IdpUserId, Result, UpstreamError,
};
use serde::Deserialize;

use super::{IdpAdapter, IdpAdapterError};

#[derive(Debug, Clone)]
pub struct IdpConfig {
    pub base_url: String,
    pub api_token: String,
    /// Only applications whose type tag matches this filter are considered
    /// by `list_applications` (spec §3).
    pub application_type_filter: String,
}

pub struct HttpIdpAdapter {
    config: IdpConfig,
    client: reqwest::Client,
}

impl HttpIdpAdapter {
    pub fn new(config: IdpConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    /// GET with one 401-triggered retry (spec §7/§9). The IdP's API token is
    /// a single long-lived value with no rotation endpoint this adapter can
    /// call, so there is nothing to refresh — the retry re-sends the same
    /// bearer, which still recovers from a transient upstream 401 instead of
    /// surfacing `UpstreamError::Unauthorized` on the first sight of one.
    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let resp = self.send_get(&url).await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        self.send_get(&url).await
    }

    async fn send_get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| to_core_error(IdpAdapterError::Http(e.to_string())))
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let resp = self.send_once(method.clone(), &url, body).await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        self.send_once(method, &url, body).await
    }

    async fn send_once(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut req = self.client.request(method, url).bearer_auth(&self.config.api_token);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| to_core_error(IdpAdapterError::Http(e.to_string())))
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(to_core_error(IdpAdapterError::Status { status, body }));
        }
        resp.json().await.map_err(|e| to_core_error(IdpAdapterError::Decode(e.to_string())))
    }

    async fn ok_or_error(resp: reqwest::Response) -> Result<()> {
        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(to_core_error(IdpAdapterError::Status { status, body }))
    }
}

fn to_core_error(err: IdpAdapterError) -> Error {
    match err {
        IdpAdapterError::Status { status: 404, body } => {
            Error::Upstream(UpstreamError::NotFound { resource: "idp", id: body })
        }
        IdpAdapterError::Status { status: 409, body } => {
            Error::Upstream(UpstreamError::Conflict { resource: "idp", id: body })
        }
        IdpAdapterError::Status { status: 401, body } => {
            Error::Upstream(UpstreamError::Unauthorized(body))
        }
        IdpAdapterError::Status { status: 429, body } => {
            Error::Upstream(UpstreamError::RateLimited(body))
        }
        IdpAdapterError::Status { status, body } => {
            Error::Upstream(UpstreamError::Transient(status.to_string(), body))
        }
        IdpAdapterError::Http(msg) => Error::Upstream(UpstreamError::Transient("request".into(), msg)),
        IdpAdapterError::Decode(msg) => Error::Validation(msg),
    }
}

#[derive(Deserialize)]
struct GroupsPage {
    groups: Vec<IdpGroup>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct UsersPage {
    users: Vec<IdpUser>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct ApplicationsPage {
    applications: Vec<IdpApplication>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct AssignmentsPage {
    group_ids: Vec<IdpGroupId>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct LogsPage {
    events: Vec<EventLogEntry>,
    #[serde(default)]
    next: Option<String>,
}

#[async_trait]
impl IdpAdapter for HttpIdpAdapter {
    async fn create_group(&self, profile: IdpGroupProfile) -> Result<IdpGroup> {
        let body = serde_json::to_value(&profile).map_err(|e| to_core_error(IdpAdapterError::Decode(e.to_string())))?;
        let resp = self.send_json(reqwest::Method::POST, "/groups", Some(&body)).await?;
        Self::decode(resp).await
    }

    async fn get_group(&self, id: &IdpGroupId) -> Result<Option<IdpGroup>> {
        let resp = self.get(&format!("/groups/{}", id.as_str())).await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    async fn find_group_by_directory_id(&self, directory_id: DirGroupId) -> Result<Option<IdpGroup>> {
        // At most one IdpGroup may carry a given directory_id (data model
        // invariant); exhaust pagination and return the first match.
        let mut path = "/groups".to_string();
        loop {
            let resp = self.get(&path).await?;
            let page: GroupsPage = Self::decode(resp).await?;
            for group in page.groups {
                if group.profile.directory_id()? == Some(directory_id) {
                    return Ok(Some(group));
                }
            }
            match page.next {
                Some(next) => path = next,
                None => return Ok(None),
            }
        }
    }

    async fn update_group_profile(&self, id: &IdpGroupId, profile: IdpGroupProfile) -> Result<()> {
        let body = serde_json::to_value(&profile).map_err(|e| to_core_error(IdpAdapterError::Decode(e.to_string())))?;
        let resp = self
            .send_json(reqwest::Method::PUT, &format!("/groups/{}", id.as_str()), Some(&body))
            .await?;
        Self::ok_or_error(resp).await
    }

    async fn delete_group(&self, id: &IdpGroupId) -> Result<()> {
        let resp = self.send_json(reqwest::Method::DELETE, &format!("/groups/{}", id.as_str()), None).await?;
        Self::ok_or_error(resp).await
    }

    async fn add_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        let path = format!("/groups/{}/users/{}", group_id.as_str(), user_id.as_str());
        let resp = self.send_json(reqwest::Method::PUT, &path, None).await?;
        Self::ok_or_error(resp).await
    }

    async fn remove_group_member(&self, group_id: &IdpGroupId, user_id: &IdpUserId) -> Result<()> {
        let path = format!("/groups/{}/users/{}", group_id.as_str(), user_id.as_str());
        let resp = self.send_json(reqwest::Method::DELETE, &path, None).await?;
        Self::ok_or_error(resp).await
    }

    async fn get_user(&self, id: &IdpUserId) -> Result<Option<IdpUser>> {
        let resp = self.get(&format!("/users/{}", id.as_str())).await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdpUser>> {
        let resp = self.get(&format!("/users?filter=email+eq+%22{email}%22")).await?;
        let page: UsersPage = Self::decode(resp).await?;
        Ok(page.users.into_iter().next())
    }

    async fn list_users(&self) -> Result<Vec<IdpUser>> {
        let mut out = Vec::new();
        let mut path = "/users".to_string();
        loop {
            let resp = self.get(&path).await?;
            let page: UsersPage = Self::decode(resp).await?;
            out.extend(page.users);
            match page.next {
                Some(next) => path = next,
                None => break,
            }
        }
        Ok(out)
    }

    async fn deactivate_user(&self, id: &IdpUserId) -> Result<()> {
        let resp = self
            .send_json(reqwest::Method::POST, &format!("/users/{}/lifecycle/deactivate", id.as_str()), None)
            .await?;
        Self::ok_or_error(resp).await
    }

    async fn clear_user_sessions(&self, id: &IdpUserId) -> Result<()> {
        let resp = self.send_json(reqwest::Method::DELETE, &format!("/users/{}/sessions", id.as_str()), None).await?;
        Self::ok_or_error(resp).await
    }

    async fn suspend_user(&self, id: &IdpUserId) -> Result<()> {
        let resp = self
            .send_json(reqwest::Method::POST, &format!("/users/{}/lifecycle/suspend", id.as_str()), None)
            .await?;
        Self::ok_or_error(resp).await
    }

    async fn unsuspend_user(&self, id: &IdpUserId) -> Result<()> {
        let resp = self
            .send_json(reqwest::Method::POST, &format!("/users/{}/lifecycle/unsuspend", id.as_str()), None)
            .await?;
        Self::ok_or_error(resp).await
    }

    async fn delete_user(&self, id: &IdpUserId) -> Result<()> {
        let resp = self.send_json(reqwest::Method::DELETE, &format!("/users/{}", id.as_str()), None).await?;
        Self::ok_or_error(resp).await
    }

    async fn list_applications(&self) -> Result<Vec<IdpApplication>> {
        // The type filter is applied server-side; only applications of this
        // configured type are ever returned (spec §3).
        let mut out = Vec::new();
        let mut path = format!("/apps?filter=type+eq+%22{}%22", self.config.application_type_filter);
        loop {
            let resp = self.get(&path).await?;
            let page: ApplicationsPage = Self::decode(resp).await?;
            out.extend(page.applications);
            match page.next {
                Some(next) => path = next,
                None => break,
            }
        }
        Ok(out)
    }

    async fn list_application_group_assignments(&self, app_id: &IdpApplicationId) -> Result<Vec<IdpGroupId>> {
        let mut out = Vec::new();
        let mut path = format!("/apps/{}/groups", app_id.as_str());
        loop {
            let resp = self.get(&path).await?;
            let page: AssignmentsPage = Self::decode(resp).await?;
            out.extend(page.group_ids);
            match page.next {
                Some(next) => path = next,
                None => break,
            }
        }
        Ok(out)
    }

    async fn assign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        let path = format!("/apps/{}/groups/{}", app_id.as_str(), group_id.as_str());
        let resp = self.send_json(reqwest::Method::PUT, &path, None).await?;
        Self::ok_or_error(resp).await
    }

    async fn unassign_application_group(&self, app_id: &IdpApplicationId, group_id: &IdpGroupId) -> Result<()> {
        let path = format!("/apps/{}/groups/{}", app_id.as_str(), group_id.as_str());
        let resp = self.send_json(reqwest::Method::DELETE, &path, None).await?;
        Self::ok_or_error(resp).await
    }

    async fn get_logs_bounded(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<EventLogEntry>> {
        let mut out = Vec::new();
        let mut path = format!(
            "/logs?since={}&until={}",
            since.to_rfc3339(),
            until.to_rfc3339()
        );
        loop {
            let resp = self.get(&path).await?;
            let page: LogsPage = Self::decode(resp).await?;
            out.extend(page.events);
            match page.next {
                Some(next) => path = next,
                None => break,
            }
        }
        Ok(out)
    }
}
