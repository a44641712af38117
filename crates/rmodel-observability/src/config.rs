// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Observability configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use rmodel_config::{LogFormat, LoggingConfig};

/// Where file logs go and how many old runs are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogOptions {
    /// Base directory; each run gets its own `run_<timestamp>` folder
    pub log_dir: PathBuf,
    /// Remove run folders older than this many days
    pub retention_days: u64,
    /// Keep at most this many run folders
    pub retention_runs: usize,
}

impl Default for FileLogOptions {
    fn default() -> Self {
        FileLogOptions {
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
