// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Identifier newtypes.
//!
//! Directory-side entities (`DirUser`, `DirGroup`, `DirOrg`) carry stable
//! UUIDs, per the data model. IdP-side entities are opaque strings minted by
//! the external provider — we never construct them, only parse what the IdP
//! hands back. `AuditId` is generated locally (nanoid) for sweep-triggered
//! operations that have no upstream `audit_id` to correlate against.

use std::fmt;
use uuid::Uuid;

/// Define a UUID-backed newtype for a Directory entity id.
macro_rules! define_uuid_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

/// Define an opaque string newtype for an IdP-minted id.
macro_rules! define_opaque_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_uuid_id! {
    /// Stable id of a Directory user.
    pub struct DirUserId;
}

define_uuid_id! {
    /// Stable id of a Directory group.
    pub struct DirGroupId;
}

define_uuid_id! {
    /// Stable id of a Directory organization.
    pub struct DirOrgId;
}

define_opaque_id! {
    /// Opaque id minted by the IdP for a group.
    pub struct IdpGroupId;
}

define_opaque_id! {
    /// Opaque id minted by the IdP for a user.
    pub struct IdpUserId;
}

define_opaque_id! {
    /// Opaque id minted by the IdP for an application.
    pub struct IdpApplicationId;
}

/// Correlation id for an audit record.
///
/// Bus-triggered operations reuse the triggering event's `audit_id`;
/// sweep-triggered operations mint a fresh one so every audit record still
/// has a unique correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub String);

impl AuditId {
    pub fn generate() -> Self {
        Self(format!("swp_{}", nanoid::nanoid!(16)))
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AuditId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AuditId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
