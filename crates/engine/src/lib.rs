// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! idp-sync-engine: the reconciliation engine itself.
//!
//! Three cooperating long-lived pieces sit on top of `idp-sync-adapters`:
//! the stateless [`reconciler::Reconciler`] (per-entity operations and the
//! periodic full sweep), the [`poller::EventLogPoller`] that projects IdP
//! lifecycle events back onto the Directory, and the [`consumer::EventConsumer`]
//! that routes bus messages onto the reconciler. [`metrics::Counters`] is the
//! shared counter registry all three report into.

pub mod consumer;
pub mod metrics;
pub mod poller;
pub mod reconciler;

pub use consumer::{ConsumerConfig, EventConsumer};
pub use metrics::Counters;
pub use poller::{EventLogPoller, PollerConfig};
pub use reconciler::{AuditContext, GroupAssignmentInput, Reconciler, ReconcilerPolicy, SweepReport};
