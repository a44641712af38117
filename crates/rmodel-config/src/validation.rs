// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs; all failures are reported together in one
//! `ConfigError::ValidationError`.

use crate::{ConfigError, ConfigResult, MemoryBackend, RmodelConfig};

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => write!(f, "{} must be at least 1", field),
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - worker pool and queue sizes of at least 1
/// - a known log level
/// - a data directory when the file memory backend is selected
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &RmodelConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Run every check and return the individual failures
pub fn collect_errors(config: &RmodelConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_brain(config, &mut errors);
    validate_memory(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn validate_brain(config: &RmodelConfig, errors: &mut Vec<ConfigValidationError>) {
    let sizes = [
        ("brain.worker_num", config.brain.worker_num),
        ("brain.neuron_queue_len", config.brain.neuron_queue_len),
        ("brain.event_queue_len", config.brain.event_queue_len),
    ];
    for (field, value) in sizes {
        if value == 0 {
            errors.push(ConfigValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }
}

fn validate_memory(config: &RmodelConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.memory.backend == MemoryBackend::File
        && config.memory.data_dir.as_os_str().is_empty()
    {
        errors.push(ConfigValidationError::MissingRequired {
            field: "memory.data_dir".to_string(),
        });
    }
}

fn validate_logging(config: &RmodelConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
}
