// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Layered startup configuration (spec §4.10): built-in defaults → an
//! optional TOML file → environment variables (`IDP_SYNC_*`) → CLI flags,
//! each layer overriding the previous one field-by-field. Mirrors the
//! teacher's env-first, flag-overridable style (`daemon::env`) but
//! generalized into one typed `Config` loaded once at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::duration::{parse_chrono_duration, parse_duration};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration field: {0}")]
    Missing(&'static str),
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl From<ConfigError> for idp_sync_core::Error {
    fn from(e: ConfigError) -> Self {
        idp_sync_core::Error::Config(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IdpConfig {
    pub base_url: String,
    pub api_token: String,
    pub application_type_filter: String,
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    pub url: String,
    pub creds_file: Option<PathBuf>,
    pub identity_runtime_socket: Option<PathBuf>,
    pub identity_runtime_timeout: Duration,
    pub subject_prefix: String,
    pub queue_group: String,
    pub queue_size: usize,
}

#[derive(Debug, Clone)]
pub struct LockConfig {
    pub enabled: bool,
    pub bucket: String,
    pub key: String,
    pub ttl_margin: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub idp: IdpConfig,
    pub bus: BusConfig,
    pub lock: LockConfig,
    pub reconciler_interval: Duration,
    pub cold_start_lookback: chrono::Duration,
    pub poll_interval: Duration,
    pub deletion_cutoff: chrono::Duration,
    pub dry_run: bool,
    pub skip_delete: bool,
    pub selector_prefix: Option<String>,
    pub audit_log_path: PathBuf,
    pub audit_retry_interval: Duration,
    pub audit_max_wait: Duration,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: String,
}

/// Mirrors [`Config`] with every field optional, for TOML deserialization.
/// Durations are plain strings here (`"30s"`) and parsed during the merge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub directory_base_url: Option<String>,
    pub directory_token_url: Option<String>,
    pub directory_client_id: Option<String>,
    pub directory_client_secret: Option<String>,
    pub directory_audience: Option<String>,
    pub directory_scopes: Option<Vec<String>>,

    pub idp_base_url: Option<String>,
    pub idp_api_token: Option<String>,
    pub idp_application_type_filter: Option<String>,

    pub bus_url: Option<String>,
    pub bus_creds_file: Option<PathBuf>,
    pub identity_runtime_socket: Option<PathBuf>,
    pub identity_runtime_timeout: Option<String>,
    pub subject_prefix: Option<String>,
    pub queue_group: Option<String>,
    pub queue_size: Option<usize>,

    pub lock_enabled: Option<bool>,
    pub lock_bucket: Option<String>,
    pub lock_key: Option<String>,
    pub lock_ttl_margin: Option<String>,

    pub reconciler_interval: Option<String>,
    pub cold_start_lookback: Option<String>,
    pub poll_interval: Option<String>,
    pub deletion_cutoff: Option<String>,

    pub dry_run: Option<bool>,
    pub skip_delete: Option<bool>,
    pub selector_prefix: Option<String>,

    pub audit_log_path: Option<PathBuf>,
    pub audit_retry_interval: Option<String>,
    pub audit_max_wait: Option<String>,

    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
}

impl PartialConfig {
    fn merge(self, other: PartialConfig) -> PartialConfig {
        PartialConfig {
            directory_base_url: other.directory_base_url.or(self.directory_base_url),
            directory_token_url: other.directory_token_url.or(self.directory_token_url),
            directory_client_id: other.directory_client_id.or(self.directory_client_id),
            directory_client_secret: other.directory_client_secret.or(self.directory_client_secret),
            directory_audience: other.directory_audience.or(self.directory_audience),
            directory_scopes: other.directory_scopes.or(self.directory_scopes),

            idp_base_url: other.idp_base_url.or(self.idp_base_url),
            idp_api_token: other.idp_api_token.or(self.idp_api_token),
            idp_application_type_filter: other.idp_application_type_filter.or(self.idp_application_type_filter),

            bus_url: other.bus_url.or(self.bus_url),
            bus_creds_file: other.bus_creds_file.or(self.bus_creds_file),
            identity_runtime_socket: other.identity_runtime_socket.or(self.identity_runtime_socket),
            identity_runtime_timeout: other.identity_runtime_timeout.or(self.identity_runtime_timeout),
            subject_prefix: other.subject_prefix.or(self.subject_prefix),
            queue_group: other.queue_group.or(self.queue_group),
            queue_size: other.queue_size.or(self.queue_size),

            lock_enabled: other.lock_enabled.or(self.lock_enabled),
            lock_bucket: other.lock_bucket.or(self.lock_bucket),
            lock_key: other.lock_key.or(self.lock_key),
            lock_ttl_margin: other.lock_ttl_margin.or(self.lock_ttl_margin),

            reconciler_interval: other.reconciler_interval.or(self.reconciler_interval),
            cold_start_lookback: other.cold_start_lookback.or(self.cold_start_lookback),
            poll_interval: other.poll_interval.or(self.poll_interval),
            deletion_cutoff: other.deletion_cutoff.or(self.deletion_cutoff),

            dry_run: other.dry_run.or(self.dry_run),
            skip_delete: other.skip_delete.or(self.skip_delete),
            selector_prefix: other.selector_prefix.or(self.selector_prefix),

            audit_log_path: other.audit_log_path.or(self.audit_log_path),
            audit_retry_interval: other.audit_retry_interval.or(self.audit_retry_interval),
            audit_max_wait: other.audit_max_wait.or(self.audit_max_wait),

            log_dir: other.log_dir.or(self.log_dir),
            metrics_addr: other.metrics_addr.or(self.metrics_addr),
        }
    }

    /// Reads `IDP_SYNC_*` environment variables, one per field.
    fn from_env() -> PartialConfig {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|s| !s.is_empty())
        }
        PartialConfig {
            directory_base_url: var("IDP_SYNC_DIRECTORY_BASE_URL"),
            directory_token_url: var("IDP_SYNC_DIRECTORY_TOKEN_URL"),
            directory_client_id: var("IDP_SYNC_DIRECTORY_CLIENT_ID"),
            directory_client_secret: var("IDP_SYNC_DIRECTORY_CLIENT_SECRET"),
            directory_audience: var("IDP_SYNC_DIRECTORY_AUDIENCE"),
            directory_scopes: var("IDP_SYNC_DIRECTORY_SCOPES")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect()),

            idp_base_url: var("IDP_SYNC_IDP_BASE_URL"),
            idp_api_token: var("IDP_SYNC_IDP_API_TOKEN"),
            idp_application_type_filter: var("IDP_SYNC_IDP_APPLICATION_TYPE_FILTER"),

            bus_url: var("IDP_SYNC_BUS_URL"),
            bus_creds_file: var("IDP_SYNC_BUS_CREDS_FILE").map(PathBuf::from),
            identity_runtime_socket: var("IDP_SYNC_IDENTITY_RUNTIME_SOCKET").map(PathBuf::from),
            identity_runtime_timeout: var("IDP_SYNC_IDENTITY_RUNTIME_TIMEOUT"),
            subject_prefix: var("IDP_SYNC_SUBJECT_PREFIX"),
            queue_group: var("IDP_SYNC_QUEUE_GROUP"),
            queue_size: var("IDP_SYNC_QUEUE_SIZE").and_then(|s| s.parse().ok()),

            lock_enabled: var("IDP_SYNC_LOCK_ENABLED").and_then(|s| s.parse().ok()),
            lock_bucket: var("IDP_SYNC_LOCK_BUCKET"),
            lock_key: var("IDP_SYNC_LOCK_KEY"),
            lock_ttl_margin: var("IDP_SYNC_LOCK_TTL_MARGIN"),

            reconciler_interval: var("IDP_SYNC_RECONCILER_INTERVAL"),
            cold_start_lookback: var("IDP_SYNC_COLD_START_LOOKBACK"),
            poll_interval: var("IDP_SYNC_POLL_INTERVAL"),
            deletion_cutoff: var("IDP_SYNC_DELETION_CUTOFF"),

            dry_run: var("IDP_SYNC_DRY_RUN").and_then(|s| s.parse().ok()),
            skip_delete: var("IDP_SYNC_SKIP_DELETE").and_then(|s| s.parse().ok()),
            selector_prefix: var("IDP_SYNC_SELECTOR_PREFIX"),

            audit_log_path: var("IDP_SYNC_AUDIT_LOG_PATH").map(PathBuf::from),
            audit_retry_interval: var("IDP_SYNC_AUDIT_RETRY_INTERVAL"),
            audit_max_wait: var("IDP_SYNC_AUDIT_MAX_WAIT"),

            log_dir: var("IDP_SYNC_LOG_DIR").map(PathBuf::from),
            metrics_addr: var("IDP_SYNC_METRICS_ADDR"),
        }
    }

    fn defaults() -> PartialConfig {
        PartialConfig {
            directory_scopes: Some(Vec::new()),
            idp_application_type_filter: Some("oauth".to_string()),
            subject_prefix: Some(idp_sync_wire::DEFAULT_SUBJECT_PREFIX.to_string()),
            queue_group: Some("idp-sync".to_string()),
            queue_size: Some(1),
            identity_runtime_timeout: Some("2s".to_string()),
            lock_enabled: Some(true),
            lock_bucket: Some("idp-sync-lock".to_string()),
            lock_key: Some("leader".to_string()),
            lock_ttl_margin: Some("10s".to_string()),
            reconciler_interval: Some("5m".to_string()),
            cold_start_lookback: Some("6h".to_string()),
            poll_interval: Some("30s".to_string()),
            deletion_cutoff: Some("24h".to_string()),
            dry_run: Some(false),
            skip_delete: Some(false),
            audit_log_path: Some(PathBuf::from("/var/log/idp-sync/audit.jsonl")),
            audit_retry_interval: Some("1s".to_string()),
            audit_max_wait: Some("30s".to_string()),
            metrics_addr: Some("0.0.0.0:9090".to_string()),
            ..Default::default()
        }
    }

    fn from_file(path: &std::path::Path) -> Result<PartialConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
    }

    fn resolve(self) -> Result<Config, ConfigError> {
        fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
            value.filter(|s| !s.is_empty()).ok_or(ConfigError::Missing(field))
        }
        fn duration(value: Option<String>, field: &'static str, default: &str) -> Result<Duration, ConfigError> {
            let s = value.unwrap_or_else(|| default.to_string());
            parse_duration(&s).map_err(|message| ConfigError::Invalid { field, message })
        }
        fn chrono_duration(
            value: Option<String>,
            field: &'static str,
            default: &str,
        ) -> Result<chrono::Duration, ConfigError> {
            let s = value.unwrap_or_else(|| default.to_string());
            parse_chrono_duration(&s).map_err(|message| ConfigError::Invalid { field, message })
        }

        Ok(Config {
            directory: DirectoryConfig {
                base_url: required(self.directory_base_url, "directory_base_url")?,
                token_url: required(self.directory_token_url, "directory_token_url")?,
                client_id: required(self.directory_client_id, "directory_client_id")?,
                client_secret: required(self.directory_client_secret, "directory_client_secret")?,
                audience: self.directory_audience,
                scopes: self.directory_scopes.unwrap_or_default(),
            },
            idp: IdpConfig {
                base_url: required(self.idp_base_url, "idp_base_url")?,
                api_token: required(self.idp_api_token, "idp_api_token")?,
                application_type_filter: self.idp_application_type_filter.unwrap_or_else(|| "oauth".into()),
            },
            bus: BusConfig {
                url: required(self.bus_url, "bus_url")?,
                creds_file: self.bus_creds_file,
                identity_runtime_socket: self.identity_runtime_socket,
                identity_runtime_timeout: duration(
                    self.identity_runtime_timeout,
                    "identity_runtime_timeout",
                    "2s",
                )?,
                subject_prefix: self
                    .subject_prefix
                    .unwrap_or_else(|| idp_sync_wire::DEFAULT_SUBJECT_PREFIX.to_string()),
                queue_group: self.queue_group.unwrap_or_else(|| "idp-sync".to_string()),
                queue_size: self.queue_size.unwrap_or(1),
            },
            lock: LockConfig {
                enabled: self.lock_enabled.unwrap_or(true),
                bucket: self.lock_bucket.unwrap_or_else(|| "idp-sync-lock".to_string()),
                key: self.lock_key.unwrap_or_else(|| "leader".to_string()),
                ttl_margin: duration(self.lock_ttl_margin, "lock_ttl_margin", "10s")?,
            },
            reconciler_interval: duration(self.reconciler_interval, "reconciler_interval", "5m")?,
            cold_start_lookback: chrono_duration(self.cold_start_lookback, "cold_start_lookback", "6h")?,
            poll_interval: duration(self.poll_interval, "poll_interval", "30s")?,
            deletion_cutoff: chrono_duration(self.deletion_cutoff, "deletion_cutoff", "24h")?,
            dry_run: self.dry_run.unwrap_or(false),
            skip_delete: self.skip_delete.unwrap_or(false),
            selector_prefix: self.selector_prefix,
            audit_log_path: self
                .audit_log_path
                .unwrap_or_else(|| PathBuf::from("/var/log/idp-sync/audit.jsonl")),
            audit_retry_interval: duration(self.audit_retry_interval, "audit_retry_interval", "1s")?,
            audit_max_wait: duration(self.audit_max_wait, "audit_max_wait", "30s")?,
            log_dir: self.log_dir,
            metrics_addr: self.metrics_addr.unwrap_or_else(|| "0.0.0.0:9090".to_string()),
        })
    }
}

/// CLI-flag overrides, highest-precedence layer. Every field mirrors a
/// `PartialConfig` field the corresponding `clap` flag can also read via its
/// `env` attribute (spec §4.10, §6).
pub type ConfigOverrides = PartialConfig;

/// Resolve the TOML config file path: an explicit `--config` flag wins over
/// `IDP_SYNC_CONFIG`; neither set means no file layer.
pub fn resolve_config_path(cli_flag: Option<PathBuf>) -> Option<PathBuf> {
    cli_flag.or_else(|| std::env::var("IDP_SYNC_CONFIG").ok().map(PathBuf::from))
}

/// Load configuration from defaults, an optional TOML file, environment
/// variables, and CLI overrides, in that precedence order (spec §4.10).
pub fn load(config_path: Option<&std::path::Path>, overrides: ConfigOverrides) -> Result<Config, ConfigError> {
    let mut merged = PartialConfig::defaults();
    if let Some(path) = config_path {
        merged = merged.merge(PartialConfig::from_file(path)?);
    }
    merged = merged.merge(PartialConfig::from_env());
    merged = merged.merge(overrides);
    merged.resolve()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
