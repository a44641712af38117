// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! # rmodel-observability
//!
//! Logging setup shared by every rmodel binary and test harness.
//!
//! Library crates only emit `tracing` events. Whoever owns `main` picks the
//! subscriber here, driven by the `[logging]` section of the configuration
//! and by per-crate debug flags (`--debug-rmodel-brain`, `RMODEL_DEBUG=all`).
//!
//! ## Features
//! - `file-logging`: JSON log files in timestamped run folders with retention cleanup

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known rmodel crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "rmodel",
    "rmodel-brain",
    "rmodel-memory",
    "rmodel-config",
    "rmodel-state-manager",
    "rmodel-observability",
];

/// Convert a crate name into the target its `tracing` events carry
/// (`rmodel-brain` logs under `rmodel_brain`).
pub fn tracing_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
