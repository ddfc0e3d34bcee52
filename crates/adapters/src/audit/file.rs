// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Append-only JSON-lines audit sink.
//!
//! Each `record()` call opens, writes, and closes the file — the write
//! frequency here (one line per state-changing operation) is low enough that
//! this is safe, the same tradeoff the teacher's `JobLogger` makes for
//! per-job activity logs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use idp_sync_core::AuditRecord;

use super::{AuditSink, AuditSinkError};

pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    /// Opens (creating if absent) the audit log at `path`, retrying with
    /// `retry_interval` until it becomes writable or `max_wait` elapses.
    ///
    /// A sidecar initializer is expected to create the parent directory
    /// before this process's first sweep; blocking here rather than failing
    /// fast avoids a hard ordering dependency at deploy time (spec §4.8).
    pub async fn open(path: PathBuf, retry_interval: Duration, max_wait: Duration) -> Result<Self, AuditSinkError> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            match Self::try_open(&path) {
                Ok(()) => return Ok(Self { path }),
                Err(e) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(AuditSinkError::Write(format!(
                            "audit log path {} never became writable: {e}",
                            path.display()
                        )));
                    }
                    tracing::warn!(path = %path.display(), error = %e, "audit log not yet writable, retrying");
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    fn try_open(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(())
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        let line = serde_json::to_string(&record).map_err(|e| AuditSinkError::Write(e.to_string()))?;
        self.append_line(&line).map_err(|e| AuditSinkError::Write(e.to_string()))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
