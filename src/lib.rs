// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! # rmodel
//!
//! Event-driven dataflow engine. Work is split into neurons connected by
//! links; a brain runs a blueprint on a worker pool, moving data through a
//! shared key-value memory and going back to sleep once nothing is left to do.
//!
//! ## Feature Flags
//! - **`observability`** (default): logging setup helpers
//! - **`file-logging`**: JSON log files with retention cleanup
//!
//! ## Usage
//!
//! ```rust
//! use rmodel::prelude::*;
//!
//! let mut bp = Blueprint::new();
//! let double = bp.add_neuron_fn(|ctx| {
//!     let n = ctx.get_memory("n")?.and_then(|v| v.as_i64()).unwrap_or(0);
//!     ctx.set_memory("n", n * 2)?;
//!     Ok(())
//! });
//! bp.add_entry_link_to(&double).unwrap();
//! bp.add_end_link_from(&double).unwrap();
//!
//! let brain = Brain::new(&bp).unwrap();
//! brain.entry_with_memory([("n", 21i64)]).unwrap();
//! brain.wait();
//! assert_eq!(brain.get_memory("n").unwrap().and_then(|v| v.as_i64()), Some(42));
//! ```
//!
//! ## Crates
//! - **rmodel-brain**: blueprint, maintainer, worker pool, lifecycle
//! - **rmodel-memory**: in-process and file-backed memory stores
//! - **rmodel-state-manager**: brain/neuron/link states and the state signal
//! - **rmodel-config**: `rmodel_configuration.toml` loading with environment and CLI overrides
//! - **rmodel-observability**: tracing subscriber setup and debug flags

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use rmodel_brain as brain;
pub use rmodel_config as config;
pub use rmodel_memory as memory;
pub use rmodel_state_manager as state_manager;

#[cfg(feature = "observability")]
pub use rmodel_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::brain::{
        Blueprint, Brain, BrainContext, BrainContextReader, BrainError, BrainResult,
        DefaultSelector, EmptyProcessor, FnProcessor, FnSelector, Processor, ProcessorError,
        ProcessorResult, Selector, END_NEURON_ID,
    };
    pub use crate::config::{BrainConfig, CastPolicy, RmodelConfig};
    pub use crate::memory::{Memory, MemoryKey, MemoryValue};
    pub use crate::state_manager::{BrainState, LinkState, NeuronState};
}
