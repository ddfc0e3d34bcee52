// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Client for the optional local identity-runtime sidecar that mints
//! short-lived bus tokens (spec §6).
//!
//! Calls are bounded by a configured timeout; on failure the caller falls
//! back to an empty token and logs, rather than failing the whole bus
//! connection attempt.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum IdentityRuntimeError {
    #[error("identity runtime socket {0} unreachable: {1}")]
    Connect(String, String),

    #[error("identity runtime call timed out")]
    Timeout,

    #[error("identity runtime returned malformed response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IdentityRuntimeClient: Send + Sync + 'static {
    /// Fetch a fresh access token for bus authentication. Implementations
    /// should bound their own latency; callers apply a hard timeout on top.
    async fn get_access_token(&self) -> Result<String, IdentityRuntimeError>;
}

/// JSON-RPC-over-Unix-socket client for the sidecar identity runtime.
///
/// Sends a single `{"method":"get_access_token","params":{}}` request line
/// and reads a single JSON response line back.
pub struct SocketIdentityRuntimeClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl SocketIdentityRuntimeClient {
    pub fn new(socket_path: PathBuf, timeout: Duration) -> Self {
        Self { socket_path, timeout }
    }

    /// Resolve a token with the configured timeout, falling back to an empty
    /// string and logging on any failure — callers should treat an empty
    /// token as "connect to the bus without credentials" rather than a fatal
    /// startup error.
    pub async fn resolve_or_empty(&self) -> String {
        match tokio::time::timeout(self.timeout, self.get_access_token()).await {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "identity runtime call failed, connecting without a token");
                String::new()
            }
            Err(_) => {
                tracing::warn!("identity runtime call timed out, connecting without a token");
                String::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl IdentityRuntimeClient for SocketIdentityRuntimeClient {
    async fn get_access_token(&self) -> Result<String, IdentityRuntimeError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| IdentityRuntimeError::Connect(self.socket_path.display().to_string(), e.to_string()))?;

        let request = serde_json::json!({"method": "get_access_token", "params": {}});
        let mut line = request.to_string();
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| IdentityRuntimeError::Connect(self.socket_path.display().to_string(), e.to_string()))?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| IdentityRuntimeError::Connect(self.socket_path.display().to_string(), e.to_string()))?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.ends_with(b"\n") {
                break;
            }
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&buf).map_err(|e| IdentityRuntimeError::Decode(e.to_string()))?;
        Ok(parsed.access_token)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeIdentityRuntimeClient;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use async_trait::async_trait;

    use super::{IdentityRuntimeClient, IdentityRuntimeError};

    /// Fixed-response fake, optionally configured to fail.
    pub struct FakeIdentityRuntimeClient {
        result: Result<String, String>,
    }

    impl FakeIdentityRuntimeClient {
        pub fn returning(token: impl Into<String>) -> Self {
            Self { result: Ok(token.into()) }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self { result: Err(message.into()) }
        }
    }

    #[async_trait]
    impl IdentityRuntimeClient for FakeIdentityRuntimeClient {
        async fn get_access_token(&self) -> Result<String, IdentityRuntimeError> {
            self.result.clone().map_err(IdentityRuntimeError::Decode)
        }
    }
}

#[cfg(test)]
#[path = "identity_runtime_tests.rs"]
mod tests;
