// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Single-writer lock guarding the periodic sweep (spec §4.9).

mod nats;
mod noop;

pub use nats::NatsLeaderLock;
pub use noop::NoopLeaderLock;

use async_trait::async_trait;
use idp_sync_core::Result;

/// Distributed mutex granting "I am the active reconciler" for one sweep.
///
/// `acquire` is a single compare-and-set: create-if-absent succeeds, any
/// other outcome fails non-fatally (the caller just skips this tick).
/// There is no renewal — the key's TTL is sized to outlive one sweep
/// interval, so a crashed leader is recovered automatically at the next
/// tick (spec §4.9, §5).
#[async_trait]
pub trait LeaderLock: Send + Sync + 'static {
    /// Attempt to become leader for this cycle. Returns `true` if acquired.
    async fn acquire(&self) -> Result<bool>;

    /// Best-effort release at sweep end.
    async fn release(&self);
}
