// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `rmodel_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RmodelConfig {
    pub brain: BrainConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

/// Brain runtime configuration (maintainer, worker pool, queues)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Number of neuron workers
    pub worker_num: usize,
    /// Capacity of the neuron dispatch queue
    pub neuron_queue_len: usize,
    /// Capacity of the maintainer event queue
    pub event_queue_len: usize,
    /// Delay before a forced cast retries a link that is still Ready
    pub recast_backoff_ms: u64,
    /// Whether a neuron casts after its processor failed
    pub cast_policy: CastPolicy,
    /// How long shutdown waits for runtime threads to exit
    pub shutdown_timeout_ms: u64,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            worker_num: 4,
            neuron_queue_len: 1024,
            event_queue_len: 4096,
            recast_backoff_ms: 500,
            cast_policy: CastPolicy::Always,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl BrainConfig {
    pub fn recast_backoff(&self) -> Duration {
        Duration::from_millis(self.recast_backoff_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Cast behaviour after a processor returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastPolicy {
    /// Fan out regardless of the outcome; failures only show in counters
    #[default]
    Always,
    /// Fan out only after success; a failed neuron abandons its pending cast links
    OnSuccess,
}

impl CastPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastPolicy::Always => "always",
            CastPolicy::OnSuccess => "on_success",
        }
    }
}

impl FromStr for CastPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(CastPolicy::Always),
            "on_success" | "on-success" | "onsuccess" => Ok(CastPolicy::OnSuccess),
            other => Err(ConfigError::InvalidValue(format!(
                "cast_policy must be 'always' or 'on_success', got '{}'",
                other
            ))),
        }
    }
}

/// Memory store configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    /// Directory holding file-backed stores
    pub data_dir: PathBuf,
    /// Keep the file of a file-backed store after the brain closes it
    pub keep_memory: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::Memory,
            data_dir: PathBuf::from("./rmodel_memory"),
            keep_memory: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    #[default]
    Memory,
    File,
}

impl FromStr for MemoryBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(MemoryBackend::Memory),
            "file" => Ok(MemoryBackend::File),
            other => Err(ConfigError::InvalidValue(format!(
                "memory.backend must be 'memory' or 'file', got '{}'",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_brain_section() {
        let config: RmodelConfig = toml::from_str(
            r#"
            [brain]
            worker_num = 8
            cast_policy = "on_success"
            "#,
        )
        .unwrap();

        assert_eq!(config.brain.worker_num, 8);
        assert_eq!(config.brain.cast_policy, CastPolicy::OnSuccess);
        assert_eq!(config.brain.recast_backoff_ms, 500);
        assert_eq!(config.memory, MemoryConfig::default());
    }

    #[test]
    fn test_cast_policy_from_str() {
        assert_eq!("Always".parse::<CastPolicy>().unwrap(), CastPolicy::Always);
        assert_eq!("on-success".parse::<CastPolicy>().unwrap(), CastPolicy::OnSuccess);
        assert!("sometimes".parse::<CastPolicy>().is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(RmodelConfig::default()).unwrap();
        assert_eq!(json["brain"]["cast_policy"], "always");
        assert_eq!(json["memory"]["backend"], "memory");
    }
}
