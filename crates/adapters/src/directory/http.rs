// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! `reqwest`-backed `DirectoryAdapter`.
//!
//! Authenticates with OAuth2 client-credentials against a configured token
//! URL. The bearer is cached and shared under a single `parking_lot::Mutex`
//! (spec §5, §9) — the mutex guards only the cached string and its expiry,
//! never held across an outbound request.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idp_sync_core::{
    DirGroup, DirGroupId, DirOrg, DirUser, DirUserId, Error, IdpUserId, Result, UpstreamError,
    UserStatus,
};
use parking_lot::Mutex;
use serde::Deserialize;

use super::{DirectoryAdapter, DirectoryAdapterError};

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: Option<String>,
    pub scopes: Vec<String>,
}

struct CachedToken {
    bearer: String,
    expires_at: DateTime<Utc>,
}

pub struct HttpDirectoryAdapter {
    config: DirectoryConfig,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl HttpDirectoryAdapter {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config, client: reqwest::Client::new(), token: Mutex::new(None) }
    }

    /// Returns a valid bearer, refreshing it first if absent or within 30s of
    /// expiry. Never holds the mutex while the refresh request is in flight.
    async fn bearer(&self) -> Result<String> {
        {
            let guard = self.token.lock();
            if let Some(cached) = &*guard {
                if cached.expires_at > Utc::now() + chrono::Duration::seconds(30) {
                    return Ok(cached.bearer.clone());
                }
            }
        }
        self.force_refresh().await
    }

    /// Unconditionally fetches a new token and replaces the cache, regardless
    /// of the current one's expiry. Used both by `bearer()`'s expiry check
    /// and by the 401-triggered retry in `get`/`post` (spec §7/§9: "token
    /// refresh on Unauthorized, once per call").
    async fn force_refresh(&self) -> Result<String> {
        let fresh = self.refresh_token().await?;
        let bearer = fresh.bearer.clone();
        *self.token.lock() = Some(fresh);
        Ok(bearer)
    }

    async fn refresh_token(&self) -> Result<CachedToken> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.clone()),
        ];
        if let Some(audience) = &self.config.audience {
            form.push(("audience", audience.clone()));
        }
        if !self.config.scopes.is_empty() {
            form.push(("scope", self.config.scopes.join(" ")));
        }

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| DirectoryAdapterError::Auth(e.to_string()))
            .map_err(to_core_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(to_core_error(DirectoryAdapterError::Status { status, body }));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| to_core_error(DirectoryAdapterError::Decode(e.to_string())))?;

        Ok(CachedToken {
            bearer: parsed.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(parsed.expires_in.max(0)),
        })
    }

    /// GET with one 401-triggered refresh-and-retry (spec §7/§9): a bearer
    /// revoked or expired early server-side, ahead of our own 30s-window
    /// check, gets one forced refresh and one retry before the caller ever
    /// sees `UpstreamError::Unauthorized`.
    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let bearer = self.bearer().await?;
        let resp = self.send_get(&url, &bearer).await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        let bearer = self.force_refresh().await?;
        self.send_get(&url, &bearer).await
    }

    async fn send_get(&self, url: &str, bearer: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(bearer)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| to_core_error(DirectoryAdapterError::Http(e.to_string())))
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let bearer = self.bearer().await?;
        let resp = self.send_post(&url, &bearer, body).await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        let bearer = self.force_refresh().await?;
        self.send_post(&url, &bearer, body).await
    }

    async fn send_post(&self, url: &str, bearer: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        self.client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| to_core_error(DirectoryAdapterError::Http(e.to_string())))
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(to_core_error(DirectoryAdapterError::Status { status, body }));
        }
        resp.json().await.map_err(|e| to_core_error(DirectoryAdapterError::Decode(e.to_string())))
    }
}

fn to_core_error(err: DirectoryAdapterError) -> Error {
    match err {
        DirectoryAdapterError::Status { status: 404, body } => {
            Error::Upstream(UpstreamError::NotFound { resource: "directory", id: body })
        }
        DirectoryAdapterError::Status { status: 409, body } => {
            Error::Upstream(UpstreamError::Conflict { resource: "directory", id: body })
        }
        DirectoryAdapterError::Status { status: 401, body } | DirectoryAdapterError::Auth(body) => {
            Error::Upstream(UpstreamError::Unauthorized(body))
        }
        DirectoryAdapterError::Status { status: 429, body } => {
            Error::Upstream(UpstreamError::RateLimited(body))
        }
        DirectoryAdapterError::Status { status, body } => {
            Error::Upstream(UpstreamError::Transient(status.to_string(), body))
        }
        DirectoryAdapterError::Http(msg) => {
            Error::Upstream(UpstreamError::Transient("request".into(), msg))
        }
        DirectoryAdapterError::Decode(msg) => Error::Validation(msg),
    }
}

#[derive(Deserialize)]
struct GroupsPage {
    groups: Vec<DirGroup>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct UsersPage {
    users: Vec<DirUser>,
    #[serde(default)]
    next: Option<String>,
}

#[async_trait]
impl DirectoryAdapter for HttpDirectoryAdapter {
    async fn get_group(&self, id: DirGroupId) -> Result<Option<DirGroup>> {
        let resp = self.get(&format!("/groups/{id}")).await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    async fn list_groups(&self) -> Result<Vec<DirGroup>> {
        let mut out = Vec::new();
        let mut path = "/groups".to_string();
        loop {
            let resp = self.get(&path).await?;
            let page: GroupsPage = Self::decode(resp).await?;
            out.extend(page.groups);
            match page.next {
                Some(next) => path = next,
                None => break,
            }
        }
        Ok(out)
    }

    async fn list_organizations(&self) -> Result<Vec<DirOrg>> {
        #[derive(Deserialize)]
        struct OrgsResponse {
            organizations: Vec<DirOrg>,
        }
        let resp = self.get("/organizations").await?;
        let parsed: OrgsResponse = Self::decode(resp).await?;
        Ok(parsed.organizations)
    }

    async fn get_user(&self, id: DirUserId) -> Result<Option<DirUser>> {
        let resp = self.get(&format!("/users/{id}?deleted=true")).await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    async fn list_users(&self, include_deleted: bool) -> Result<Vec<DirUser>> {
        let mut out = Vec::new();
        let mut path = if include_deleted {
            "/users?deleted=true".to_string()
        } else {
            "/users".to_string()
        };
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

    async fn find_user_by_email(&self, email: &str) -> Result<Vec<DirUser>> {
        let resp = self.get(&format!("/users?email={}", urlencode(email))).await?;
        let page: UsersPage = Self::decode(resp).await?;
        Ok(page.users)
    }

    async fn create_user(
        &self,
        email: String,
        name: String,
        external_id: IdpUserId,
        status: UserStatus,
    ) -> Result<DirUser> {
        let body = serde_json::json!({
            "email": email,
            "name": name,
            "external_id": external_id.as_str(),
            "status": status,
        });
        let resp = self.post("/users", &body).await?;
        Self::decode(resp).await
    }

    async fn update_user(
        &self,
        id: DirUserId,
        external_id: IdpUserId,
        name: String,
        status: UserStatus,
    ) -> Result<DirUser> {
        let body = serde_json::json!({
            "external_id": external_id.as_str(),
            "name": name,
            "status": status,
        });
        let resp = self.post(&format!("/users/{id}"), &body).await?;
        Self::decode(resp).await
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
