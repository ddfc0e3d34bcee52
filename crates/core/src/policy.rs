// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Pure predicates and set algebra the reconciler builds on.
//!
//! Kept here, rather than in `idp-sync-engine`, because they do no I/O and
//! are exactly the kind of thing the testable-properties section of the
//! design wants exercised in isolation from any adapter.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::domain::DirUser;

/// Default cutoff for `user_deleted`: a Directory user must have been
/// soft-deleted at most this long ago to be eligible for IdP deletion.
pub const DEFAULT_DELETION_CUTOFF: Duration = Duration::hours(24);

/// `user_deleted(u)` per spec §4.5 / §8 invariant 4:
///
/// `u.id`, `u.name`, `u.email` non-empty ∧ `u.deleted_at` set ∧
/// `now − u.deleted_at ≤ cutoff`.
pub fn user_deleted(user: &DirUser, now: DateTime<Utc>, cutoff: Duration) -> bool {
    let Some(deleted_at) = user.deleted_at else { return false };
    if user.name.is_empty() || user.email.is_empty() {
        return false;
    }
    now - deleted_at <= cutoff
}

/// Result of diffing a desired set against an actual set.
pub struct SetDiff<T> {
    /// Present in `desired` but not `actual` — needs to be added.
    pub to_add: Vec<T>,
    /// Present in `actual` but not `desired` — needs to be removed.
    pub to_remove: Vec<T>,
}

/// Converge an `actual` set onto a `desired` set.
///
/// Used identically for group membership (§4.3) and group-application
/// assignment (§4.4): both reconcile to "add what's desired-but-missing,
/// remove what's present-but-undesired".
pub fn diff_sets<T: Ord + Clone>(desired: &BTreeSet<T>, actual: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff {
        to_add: desired.difference(actual).cloned().collect(),
        to_remove: actual.difference(desired).cloned().collect(),
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
