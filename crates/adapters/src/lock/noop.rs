// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

use async_trait::async_trait;
use idp_sync_core::Result;

use super::LeaderLock;

/// Lock that always grants leadership — used when running a single
/// replica, or in tests where lock contention is out of scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLeaderLock;

#[async_trait]
impl LeaderLock for NoopLeaderLock {
    async fn acquire(&self) -> Result<bool> {
        Ok(true)
    }

    async fn release(&self) {}
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
