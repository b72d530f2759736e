//! Configuration loading for the Provider Onboarding service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `ONBOARDING_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `ONBOARDING_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    /// Base URL of the authoritative provider directory serving the
    /// onboarding snapshot.
    #[serde(default = "default_providers_base_url")]
    pub providers_base_url: String,
    /// Timeout applied to the snapshot fetch; expiry counts as fetch failure.
    #[serde(default = "default_snapshot_timeout_seconds")]
    pub snapshot_timeout_seconds: u64,
    /// Time box for one whole reconciliation run (fetch + transaction).
    #[serde(default = "default_reconcile_timeout_seconds")]
    pub reconcile_timeout_seconds: u64,
    /// Number of event stream partitions, each served by one worker.
    #[serde(default = "default_event_partitions")]
    pub event_partitions: usize,
    /// Bounded queue depth per partition.
    #[serde(default = "default_event_queue_depth")]
    pub event_queue_depth: usize,
    /// Webhook receiving the "recompute derived state" signal. Log-only
    /// notification is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier_webhook_url: Option<String>,
    #[serde(default = "default_notifier_timeout_seconds")]
    pub notifier_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            providers_base_url: default_providers_base_url(),
            snapshot_timeout_seconds: default_snapshot_timeout_seconds(),
            reconcile_timeout_seconds: default_reconcile_timeout_seconds(),
            event_partitions: default_event_partitions(),
            event_queue_depth: default_event_queue_depth(),
            notifier_webhook_url: None,
            notifier_timeout_seconds: default_notifier_timeout_seconds(),
        }
    }
}

impl AppConfig {
    /// Parse the configured bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Serialize the configuration with secret material masked.
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(tokens) = value.get_mut("OPERATOR_TOKENS")
            && let Some(entries) = tokens.as_array_mut()
        {
            for entry in entries {
                *entry = serde_json::Value::String("***".to_string());
            }
        }
        serde_json::to_string(&value)
    }

    /// Validate cross-field constraints. Only the local profile may run
    /// without operator tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile != "local" && self.operator_tokens.is_empty() {
            return Err(ConfigError::MissingOperatorTokens);
        }
        if self.event_partitions == 0 || self.event_partitions > 64 {
            return Err(ConfigError::InvalidEventPartitions {
                value: self.event_partitions,
            });
        }
        if self.event_queue_depth == 0 {
            return Err(ConfigError::InvalidEventQueueDepth {
                value: self.event_queue_depth,
            });
        }
        if self.snapshot_timeout_seconds == 0
            || self.reconcile_timeout_seconds < self.snapshot_timeout_seconds
        {
            return Err(ConfigError::InvalidReconcileTimeouts {
                snapshot: self.snapshot_timeout_seconds,
                reconcile: self.reconcile_timeout_seconds,
            });
        }
        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/onboarding".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_providers_base_url() -> String {
    "http://localhost:9090/providers".to_string()
}

fn default_snapshot_timeout_seconds() -> u64 {
    30
}

fn default_reconcile_timeout_seconds() -> u64 {
    300
}

fn default_event_partitions() -> usize {
    4
}

fn default_event_queue_depth() -> usize {
    256
}

fn default_notifier_timeout_seconds() -> u64 {
    10
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error(
        "no operator tokens configured; set ONBOARDING_OPERATOR_TOKEN or ONBOARDING_OPERATOR_TOKENS"
    )]
    MissingOperatorTokens,
    #[error("event partitions must be between 1 and 64, got {value}")]
    InvalidEventPartitions { value: usize },
    #[error("event queue depth must be positive, got {value}")]
    InvalidEventQueueDepth { value: usize },
    #[error(
        "snapshot timeout must be positive and not exceed the reconcile timeout (snapshot {snapshot}s, reconcile {reconcile}s)"
    )]
    InvalidReconcileTimeouts { snapshot: u64, reconcile: u64 },
}

/// Loads configuration using layered `.env` files and `ONBOARDING_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration from layered env files plus process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("ONBOARDING_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Operator tokens: single token or comma-separated list.
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            tokens
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else if let Some(token) = layered.remove("OPERATOR_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let providers_base_url = layered
            .remove("PROVIDERS_BASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_providers_base_url);
        let snapshot_timeout_seconds = layered
            .remove("SNAPSHOT_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_snapshot_timeout_seconds);
        let reconcile_timeout_seconds = layered
            .remove("RECONCILE_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_reconcile_timeout_seconds);
        let event_partitions = layered
            .remove("EVENT_PARTITIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_event_partitions);
        let event_queue_depth = layered
            .remove("EVENT_QUEUE_DEPTH")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_event_queue_depth);
        let notifier_webhook_url = layered
            .remove("NOTIFIER_WEBHOOK_URL")
            .filter(|v| !v.is_empty());
        let notifier_timeout_seconds = layered
            .remove("NOTIFIER_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_notifier_timeout_seconds);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            providers_base_url,
            snapshot_timeout_seconds,
            reconcile_timeout_seconds,
            event_partitions,
            event_queue_depth,
            notifier_webhook_url,
            notifier_timeout_seconds,
        };

        config.bind_addr().map_err(|source| ConfigError::InvalidBindAddr {
            value: config.api_bind_addr.clone(),
            source,
        })?;
        config.validate()?;

        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("ONBOARDING_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("ONBOARDING_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
