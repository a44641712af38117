// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three layers, later ones win:
//! 1. TOML file (missing keys fall back to defaults)
//! 2. Environment variables (`RMODEL_*`)
//! 3. CLI arguments (same keys, lower-case, no prefix)

use crate::{CastPolicy, ConfigError, ConfigResult, MemoryBackend, RmodelConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for on disk
pub const CONFIG_FILE_NAME: &str = "rmodel_configuration.toml";

/// Environment variable that points at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "RMODEL_CONFIG_PATH";

/// Find the rmodel configuration file
///
/// Search order:
/// 1. `RMODEL_CONFIG_PATH` environment variable
/// 2. Current working directory: `./rmodel_configuration.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "rmodel configuration file '{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// * `config_path` - explicit file; when `None` the file is searched for.
/// * `cli_args` - optional CLI overrides (`{"worker_num": "8"}`)
///
/// # Errors
///
/// Returns an error if the file cannot be found or read, contains invalid
/// TOML, or an override carries a value that cannot be parsed.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<RmodelConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: RmodelConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Like [`load_config`], but starts from defaults when no file exists.
///
/// Overrides are still applied. Any error other than a missing file is returned.
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<RmodelConfig> {
    match load_config(None, cli_args) {
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = RmodelConfig::default();
            apply_environment_overrides(&mut config)?;
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli)?;
            }
            Ok(config)
        }
        other => other,
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `RMODEL_WORKER_NUM` -> `brain.worker_num`
/// - `RMODEL_NEURON_QUEUE_LEN` -> `brain.neuron_queue_len`
/// - `RMODEL_EVENT_QUEUE_LEN` -> `brain.event_queue_len`
/// - `RMODEL_RECAST_BACKOFF_MS` -> `brain.recast_backoff_ms`
/// - `RMODEL_CAST_POLICY` -> `brain.cast_policy`
/// - `RMODEL_MEMORY_BACKEND` -> `memory.backend`
/// - `RMODEL_DATA_DIR` -> `memory.data_dir`
/// - `RMODEL_KEEP_MEMORY` -> `memory.keep_memory`
/// - `RMODEL_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut RmodelConfig) -> ConfigResult<()> {
    let lookup = |key: &str| env::var(format!("RMODEL_{}", key.to_uppercase())).ok();
    apply_overrides(config, lookup)
}

/// Apply CLI argument overrides to configuration
///
/// Keys match the environment variables without the `RMODEL_` prefix, in
/// lower case (`worker_num`, `cast_policy`, `log_level`, ...).
pub fn apply_cli_overrides(
    config: &mut RmodelConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    apply_overrides(config, |key| cli_args.get(key).cloned())
}

fn apply_overrides<F>(config: &mut RmodelConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("worker_num") {
        config.brain.worker_num = parse_number("worker_num", &value)?;
    }
    if let Some(value) = lookup("neuron_queue_len") {
        config.brain.neuron_queue_len = parse_number("neuron_queue_len", &value)?;
    }
    if let Some(value) = lookup("event_queue_len") {
        config.brain.event_queue_len = parse_number("event_queue_len", &value)?;
    }
    if let Some(value) = lookup("recast_backoff_ms") {
        config.brain.recast_backoff_ms = parse_number("recast_backoff_ms", &value)?;
    }
    if let Some(value) = lookup("cast_policy") {
        config.brain.cast_policy = value.parse::<CastPolicy>()?;
    }

    if let Some(value) = lookup("memory_backend") {
        config.memory.backend = value.parse::<MemoryBackend>()?;
    }
    if let Some(value) = lookup("data_dir") {
        config.memory.data_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup("keep_memory") {
        config.memory.keep_memory = parse_bool(&value);
    }

    if let Some(value) = lookup("log_level") {
        config.logging.level = value.to_lowercase();
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(format!("{} expects a non-negative integer, got '{}'", key, value))
    })
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}
