// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

use std::time::Duration;

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use idp_sync_core::{Error, Result};

use super::LeaderLock;

/// TTL-backed compare-and-set lock over a NATS JetStream key-value bucket.
///
/// The bucket is named `<app>-lock` (spec §4.9); the held key's value is
/// irrelevant (we store the holder's identity for operator debugging). The
/// bucket's `max_age` is the lock TTL, so an un-renewed key simply expires —
/// there is no explicit lease renewal in this design.
pub struct NatsLeaderLock {
    store: kv::Store,
    key: String,
    holder_id: String,
}

impl NatsLeaderLock {
    /// `ttl` should be `reconciler_interval + safety_margin` (default margin
    /// 10s per spec §4.9).
    pub async fn new(
        client: async_nats::Client,
        bucket: &str,
        key: &str,
        ttl: Duration,
        holder_id: String,
    ) -> Result<Self> {
        let js = jetstream::new(client);
        let store = match js.get_key_value(bucket).await {
            Ok(store) => store,
            Err(_) => js
                .create_key_value(kv::Config {
                    bucket: bucket.to_string(),
                    max_age: ttl,
                    history: 1,
                    ..Default::default()
                })
                .await
                .map_err(|e| Error::Config(format!("failed to create lock bucket {bucket}: {e}")))?,
        };
        Ok(Self { store, key: key.to_string(), holder_id })
    }
}

#[async_trait]
impl LeaderLock for NatsLeaderLock {
    async fn acquire(&self) -> Result<bool> {
        match self.store.create(&self.key, self.holder_id.clone().into()).await {
            Ok(_) => Ok(true),
            Err(_) => {
                // Already held (or the create raced and lost) — not an error,
                // just "not leader this tick".
                Ok(false)
            }
        }
    }

    async fn release(&self) {
        // Best-effort per spec §4.9: a failed delete just means the key
        // expires on its own via max_age.
        let _ = self.store.delete(&self.key).await;
    }
}
