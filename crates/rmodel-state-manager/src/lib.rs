// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! # rmodel State Manager
//!
//! Runtime state shared between the brain maintainer, its workers and the
//! threads that block on a brain.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   BrainStateSignal                  │  ← lock-free reads (AtomicU8 mirror)
//! │   Mutex<(state, version)> + Condvar │  ← broadcast on every write
//! └─────────────────────────────────────┘
//!           ↓
//! ┌─────────────────────────────────────┐
//! │   StateEvent subscribers            │  ← crossbeam channels, pruned on disconnect
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use rmodel_state_manager::{BrainState, BrainStateSignal};
//!
//! let signal = BrainStateSignal::new();
//! assert_eq!(signal.get(), BrainState::Shutdown);
//!
//! signal.set(BrainState::Sleeping);
//! let observed = signal.wait_until(|s| s != BrainState::Running);
//! assert_eq!(observed, BrainState::Sleeping);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod core_state; // State enums
pub mod events; // State change streaming
pub mod signal; // Broadcast state holder

pub use core_state::{BrainState, LinkState, NeuronState};
pub use events::{StateEvent, StateEventReceiver};
pub use signal::BrainStateSignal;

/// State manager error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A raw value does not name any state of the given kind
    InvalidState { kind: &'static str, raw: u8 },

    /// Waiting for a state did not finish in time
    Timeout(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::InvalidState { kind, raw } => {
                write!(f, "Invalid {} state value: {}", kind, raw)
            }
            StateError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for StateError {}

pub type Result<T> = std::result::Result<T, StateError>;
