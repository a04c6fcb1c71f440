// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Parsed from TOML into raw sections with optional fields, then resolved
//! against defaults. Durations are humantime strings ("5m", "10s").

use crate::delivery::{RetryPolicy, MAX_RETRY_ATTEMPTS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Seal-Signature";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl LockConfig {
    /// Requested TTL, or the default, never above the maximum
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_ttl).min(self.max_ttl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub timeout: Duration,
    pub max_retry_attempts: u32,
    pub retry_backoff: Duration,
    pub max_backoff: Duration,
    pub signature_header: String,
}

impl DeliveryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            backoff: self.retry_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub lock: LockConfig,
    pub delivery: DeliveryConfig,
    /// JSONL audit file; in-memory when unset
    pub audit_path: Option<PathBuf>,
    /// Write-ahead log; in-memory when unset
    pub wal_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock: LockConfig {
                default_ttl: Duration::from_secs(5 * 60),
                max_ttl: Duration::from_secs(60 * 60),
            },
            delivery: DeliveryConfig {
                timeout: Duration::from_secs(10),
                max_retry_attempts: MAX_RETRY_ATTEMPTS,
                retry_backoff: Duration::from_secs(60),
                max_backoff: Duration::from_secs(60 * 60),
                signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            },
            audit_path: None,
            wal_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    lock: RawLock,
    delivery: RawDelivery,
    audit: RawPath,
    storage: RawStorage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLock {
    #[serde(with = "humantime_serde", default)]
    default_ttl: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    max_ttl: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawDelivery {
    #[serde(with = "humantime_serde", default)]
    timeout: Option<Duration>,
    max_retry_attempts: Option<u32>,
    #[serde(with = "humantime_serde", default)]
    retry_backoff: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    max_backoff: Option<Duration>,
    signature_header: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPath {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawStorage {
    wal_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let lock = LockConfig {
            default_ttl: raw.lock.default_ttl.unwrap_or(defaults.lock.default_ttl),
            max_ttl: raw.lock.max_ttl.unwrap_or(defaults.lock.max_ttl),
        };
        if lock.max_ttl.is_zero() {
            return Err(ConfigError::Invalid("lock.max_ttl must be positive".into()));
        }

        let max_retry_attempts = raw
            .delivery
            .max_retry_attempts
            .unwrap_or(defaults.delivery.max_retry_attempts);
        if max_retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "delivery.max_retry_attempts must be at most {}",
                MAX_RETRY_ATTEMPTS
            )));
        }

        let delivery = DeliveryConfig {
            timeout: raw.delivery.timeout.unwrap_or(defaults.delivery.timeout),
            max_retry_attempts,
            retry_backoff: raw
                .delivery
                .retry_backoff
                .unwrap_or(defaults.delivery.retry_backoff),
            max_backoff: raw
                .delivery
                .max_backoff
                .unwrap_or(defaults.delivery.max_backoff),
            signature_header: raw
                .delivery
                .signature_header
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.delivery.signature_header),
        };
        if delivery.timeout.is_zero() {
            return Err(ConfigError::Invalid("delivery.timeout must be positive".into()));
        }

        Ok(Self {
            lock,
            delivery,
            audit_path: raw.audit.path,
            wal_path: raw.storage.wal_path,
        })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
