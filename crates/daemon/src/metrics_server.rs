// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Minimal hand-rolled HTTP responder for `/metrics` (Prometheus text
//! exposition) and `/healthz` (leader status, last-sweep time) (spec
//! §4.11). No framework — a raw `TcpListener` loop in the same
//! "in-process and minimal" spirit as `engine::metrics::Counters` itself:
//! two fixed routes never need more than a line-based request parse and a
//! handwritten status line.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use idp_sync_engine::Counters;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared health state the sweep loop updates and `/healthz` reports.
#[derive(Default)]
pub struct HealthState {
    is_leader: AtomicBool,
    last_sweep_unix: AtomicI64,
}

impl HealthState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { is_leader: AtomicBool::new(false), last_sweep_unix: AtomicI64::new(0) })
    }

    pub fn set_leader(&self, is_leader: bool) {
        self.is_leader.store(is_leader, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, at: DateTime<Utc>) {
        self.last_sweep_unix.store(at.timestamp(), Ordering::Relaxed);
    }

    fn render(&self) -> String {
        let last_sweep = self.last_sweep_unix.load(Ordering::Relaxed);
        let last_sweep = if last_sweep == 0 {
            "null".to_string()
        } else {
            DateTime::from_timestamp(last_sweep, 0).map(|t| format!("\"{}\"", t.to_rfc3339())).unwrap_or_else(|| "null".to_string())
        };
        format!(
            "{{\"leader\":{},\"last_sweep\":{}}}",
            self.is_leader.load(Ordering::Relaxed),
            last_sweep
        )
    }
}

/// Serve `/metrics` and `/healthz` on `addr` until `cancel` fires.
pub async fn run(
    addr: &str,
    metrics: Arc<Counters>,
    health: Arc<HealthState>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");
    serve(listener, metrics, health, cancel).await
}

async fn serve(
    listener: TcpListener,
    metrics: Arc<Counters>,
    health: Arc<HealthState>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, _peer) = accepted?;
                let metrics = metrics.clone();
                let health = health.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_one(stream, &metrics, &health).await {
                        tracing::debug!(error = %e, "metrics connection closed with error");
                    }
                });
            }
        }
    }
}

async fn serve_one(stream: tokio::net::TcpStream, metrics: &Counters, health: &HealthState) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, content_type, body) = match path {
        "/metrics" => ("200 OK", "text/plain; version=0.0.4", metrics.render()),
        "/healthz" => ("200 OK", "application/json", health.render()),
        _ => ("404 Not Found", "text/plain", "not found".to_string()),
    };

    let stream = reader.into_inner();
    let mut stream = stream;
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
#[path = "metrics_server_tests.rs"]
mod tests;
