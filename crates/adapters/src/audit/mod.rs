// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Append-only audit sink (spec §4.8).

mod file;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use file::FileAuditSink;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAuditSink;

use async_trait::async_trait;
use idp_sync_core::AuditRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditSinkError {
    #[error("failed to write audit record: {0}")]
    Write(String),
}

/// Sink every state-changing reconciler operation writes exactly one
/// `AuditRecord` to.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditSinkError>;
}
