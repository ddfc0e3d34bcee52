// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Shared error taxonomy.
//!
//! Every crate in the workspace maps its own failures onto this enum at the
//! boundary where it hands control back to the reconciler or the CLI, so the
//! reconciler's "log and continue" discipline (spec §4.1, §7) has one shape
//! to pattern-match on regardless of which adapter raised it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing mandatory startup parameter. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-2xx from the Directory or the IdP.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Malformed bus payload, missing required id, or a profile value with
    /// the wrong type.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation preconditions were not met by the Directory's current state.
    #[error("precondition error: {0}")]
    Precondition(#[from] PreconditionError),

    /// Root context was cancelled.
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} already exists with conflicting key: {id}")]
    Conflict { resource: &'static str, id: String },

    #[error("unauthorized calling {0}")]
    Unauthorized(String),

    #[error("rate limited calling {0}")]
    RateLimited(String),

    #[error("transient failure calling {0}: {1}")]
    Transient(String, String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PreconditionError {
    /// `user_delete` was asked for a user that does not satisfy `user_deleted`.
    #[error("dir user still exists and is not eligible for deletion")]
    StillExists,

    /// `group_membership_create` was asked but the Directory does not list
    /// the user as a member.
    #[error("dir user is not a member of the dir group")]
    NotPresent,

    /// `group_membership_delete` was asked but the Directory still lists the
    /// user as a member.
    #[error("dir user is still a member of the dir group")]
    StillPresent,

    /// The dir user has `status = pending` and has no matching IdP user yet.
    #[error("dir user is pending and not yet provisioned in the idp")]
    PendingUser,
}
