// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

use std::sync::Arc;

use async_trait::async_trait;
use idp_sync_core::AuditRecord;
use parking_lot::Mutex;

use super::{AuditSink, AuditSinkError};

/// In-memory audit sink recording every record in order, for engine/daemon
/// test assertions on invariant 5 (exactly one record per mutation).
#[derive(Clone, Default)]
pub struct FakeAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl FakeAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for FakeAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        self.records.lock().push(record);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
