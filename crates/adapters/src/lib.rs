// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! idp-sync-adapters: the authenticated client surfaces the reconciler is
//! built against — Directory REST, IdP management API, the leader lock, the
//! audit sink, and the identity-runtime token provider.
//!
//! Every adapter follows the same shape: a `#[async_trait]` trait, one real
//! implementation over the wire, and (behind `test-support`) a `Fake`
//! in-memory implementation the engine crate's tests are built against.

pub mod audit;
pub mod directory;
pub mod identity_runtime;
pub mod idp;
pub mod lock;

pub use audit::{AuditSink, AuditSinkError, FileAuditSink};
pub use directory::{DirectoryAdapter, DirectoryAdapterError, HttpDirectoryAdapter};
pub use identity_runtime::{IdentityRuntimeClient, IdentityRuntimeError, SocketIdentityRuntimeClient};
pub use idp::{HttpIdpAdapter, IdpAdapter, IdpAdapterError};
pub use lock::{LeaderLock, NatsLeaderLock, NoopLeaderLock};

#[cfg(any(test, feature = "test-support"))]
pub use audit::FakeAuditSink;
#[cfg(any(test, feature = "test-support"))]
pub use directory::FakeDirectoryAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use identity_runtime::FakeIdentityRuntimeClient;
#[cfg(any(test, feature = "test-support"))]
pub use idp::FakeIdpAdapter;
