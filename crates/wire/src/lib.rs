// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! idp-sync-wire: the JSON payload the Directory publishes on the message
//! bus, and the subjects the event consumer subscribes to.
//!
//! This crate has no knowledge of NATS itself (that lives in
//! `idp-sync-adapters`/`idp-sync-daemon`) — it is the shared schema both
//! sides agree on, the same separation the teacher workspace draws between
//! its `oj-wire` protocol crate and the transport that carries it.

pub mod message;
pub mod subject;

pub use message::{BusMessage, BusMessageError};
pub use subject::{Subject, DEFAULT_SUBJECT_PREFIX};
