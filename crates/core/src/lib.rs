// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! idp-sync-core: domain model for the Directory → IdP reconciliation controller.
//!
//! This crate is deliberately inert: it defines the entities the rest of the
//! workspace reconciles (`DirUser`, `DirGroup`, `DirOrg`, `IdpGroup`, `IdpUser`,
//! `IdpApplication`), the bus/audit wire-adjacent value types, the shared error
//! taxonomy, and the handful of pure predicates (`policy::user_deleted`,
//! `policy::diff`) that the reconciler builds on. It does no I/O.

pub mod clock;
pub mod domain;
pub mod error;
pub mod id;
pub mod policy;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use domain::{
    AuditOutcome, AuditRecord, AuditSource, BusAction, DirGroup, DirOrg, DirUser, EventLogEntry,
    EventLogTarget, IdpApplication, IdpGroup, IdpGroupProfile, IdpUser, IdpUserStatus, UserStatus,
};
pub use error::{Error, Result};
pub use id::{AuditId, DirGroupId, DirOrgId, DirUserId, IdpApplicationId, IdpGroupId, IdpUserId};
pub use policy::{diff_sets, user_deleted};
