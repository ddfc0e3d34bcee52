// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Builders for domain fixtures, shared by every crate's test suite.
//!
//! Gated behind `test-support` (enabled automatically under `cfg(test)`) so
//! downstream crates can depend on `idp-sync-core` with
//! `features = ["test-support"]` in `[dev-dependencies]` without pulling
//! builder code into release binaries.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::domain::{DirGroup, DirOrg, DirUser, IdpGroup, IdpGroupProfile, UserStatus};
use crate::id::{DirGroupId, DirOrgId, DirUserId, IdpGroupId};

pub struct DirUserBuilder {
    user: DirUser,
}

impl DirUserBuilder {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            user: DirUser {
                id: DirUserId::new(),
                external_id: None,
                email: email.into(),
                name: "Test User".into(),
                status: UserStatus::Active,
                deleted_at: None,
            },
        }
    }

    pub fn external_id(mut self, id: impl Into<crate::id::IdpUserId>) -> Self {
        self.user.external_id = Some(id.into());
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.user.status = status;
        self
    }

    pub fn deleted_now(mut self) -> Self {
        self.user.deleted_at = Some(Utc::now());
        self
    }

    pub fn deleted_at(mut self, at: chrono::DateTime<Utc>) -> Self {
        self.user.deleted_at = Some(at);
        self
    }

    pub fn build(self) -> DirUser {
        self.user
    }
}

pub struct DirGroupBuilder {
    group: DirGroup,
}

impl DirGroupBuilder {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            group: DirGroup {
                id: DirGroupId::new(),
                slug: slug.into(),
                name: "Test Group".into(),
                description: String::new(),
                organizations: BTreeSet::new(),
                members: BTreeSet::new(),
            },
        }
    }

    pub fn organization(mut self, id: DirOrgId) -> Self {
        self.group.organizations.insert(id);
        self
    }

    pub fn member(mut self, id: DirUserId) -> Self {
        self.group.members.insert(id);
        self
    }

    pub fn build(self) -> DirGroup {
        self.group
    }
}

pub fn dir_org(slug: impl Into<String>) -> DirOrg {
    DirOrg { id: DirOrgId::new(), slug: slug.into(), name: "Test Org".into() }
}

pub fn idp_group(directory_id: DirGroupId) -> IdpGroup {
    let mut profile =
        IdpGroupProfile { name: "Test Group".into(), description: String::new(), ..Default::default() };
    profile.set_directory_id(directory_id);
    IdpGroup { id: IdpGroupId::from(format!("idp_{}", nanoid::nanoid!(8))), profile, members: BTreeSet::new() }
}
