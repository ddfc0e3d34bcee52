// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! The `{version, action, group_id?, user_id?, audit_id}` payload published
//! on every subject (spec §3, §4.7).

use idp_sync_core::{BusAction, DirGroupId, DirUserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subject::Subject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub version: u32,
    pub action: BusAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<DirGroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DirUserId>,
    pub audit_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusMessageError {
    #[error("failed to decode bus payload: {0}")]
    Decode(String),
    #[error("{subject} message requires group_id")]
    MissingGroupId { subject: &'static str },
    #[error("{subject} message requires user_id")]
    MissingUserId { subject: &'static str },
}

impl BusMessage {
    /// Decode and validate a raw payload against the subject it arrived on.
    ///
    /// Validation per spec §4.7: `groups` messages require `group_id`;
    /// `members` messages require both; `users` messages require `user_id`.
    pub fn decode(payload: &[u8], subject: Subject) -> Result<Self, BusMessageError> {
        let msg: BusMessage =
            serde_json::from_slice(payload).map_err(|e| BusMessageError::Decode(e.to_string()))?;
        msg.validate(subject)?;
        Ok(msg)
    }

    fn validate(&self, subject: Subject) -> Result<(), BusMessageError> {
        match subject {
            Subject::Groups => {
                if self.group_id.is_none() {
                    return Err(BusMessageError::MissingGroupId { subject: "groups" });
                }
            }
            Subject::Members => {
                if self.group_id.is_none() {
                    return Err(BusMessageError::MissingGroupId { subject: "members" });
                }
                if self.user_id.is_none() {
                    return Err(BusMessageError::MissingUserId { subject: "members" });
                }
            }
            Subject::Users => {
                if self.user_id.is_none() {
                    return Err(BusMessageError::MissingUserId { subject: "users" });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
