// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! # rmodel Brain
//!
//! Event-driven dataflow runtime. A [`Blueprint`] describes neurons (units of
//! work) and links (directed edges); a [`Brain`] runs it.
//!
//! ## Architecture
//!
//! ```text
//!  entry / trig_links / recast
//!             │
//!             ▼
//!  ┌──────────────────────┐   dispatch queue   ┌──────────────────────┐
//!  │ maintainer (1 thread)│ ─────────────────▶ │ neuron workers (N)   │
//!  │ sole status writer   │ ◀───────────────── │ run processors       │
//!  └──────────────────────┘   event queue      └──────────────────────┘
//!             │
//!             ▼
//!  BrainStateSignal: Shutdown / Sleeping / Running
//! ```
//!
//! - A neuron activates when any of its trigger groups has every link Ready.
//! - After processing it casts along the cast group its selector picks.
//! - When nothing is Ready or Activated the brain goes back to Sleeping.
//!
//! ## Usage
//!
//! ```rust
//! use rmodel_brain::{Blueprint, Brain, BrainState};
//!
//! let mut bp = Blueprint::new();
//! let greet = bp.add_neuron_fn(|ctx| {
//!     ctx.set_memory("greeting", "hello")?;
//!     Ok(())
//! });
//! bp.add_entry_link_to(&greet).unwrap();
//! bp.add_end_link_from(&greet).unwrap();
//!
//! let brain = Brain::new(&bp).unwrap();
//! brain.entry().unwrap();
//! assert_eq!(brain.wait(), BrainState::Sleeping);
//! assert_eq!(
//!     brain.get_memory("greeting").unwrap().and_then(|v| v.as_str().map(str::to_string)),
//!     Some("hello".to_string())
//! );
//! brain.shutdown();
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod blueprint;
pub mod brain;
pub mod context;
pub mod error;
pub mod event;
pub mod graph;
pub mod processor;

mod maintainer; // Event loop, sole writer of graph status
mod runtime; // Queues, close signal, timed join
mod worker; // Processor execution

pub type NeuronId = String;
pub type LinkId = String;

/// Reserved id of the terminal neuron created by [`Blueprint::add_end_link_from`]
pub const END_NEURON_ID: &str = "__END_NEURON__";

/// Pseudo source of links created by [`Blueprint::add_entry_link_to`]
pub const ENTRY_LINK_FROM: &str = "__ENTRY__";

/// Cast group holding every out-link not placed in a named group
pub const DEFAULT_CAST_GROUP: &str = "__DEFAULT_CAST_GROUP__";

pub use blueprint::Blueprint;
pub use brain::Brain;
pub use context::{BrainContext, BrainContextReader};
pub use error::{BrainError, BrainResult, ProcessorError, ProcessorResult};
pub use event::{BrainAction, LinkAction, MaintainEvent, NeuronAction};
pub use graph::{trigger_group_satisfied, Counters, LinkStatus, NeuronStatus, StateCounts};
pub use processor::{DefaultSelector, EmptyProcessor, FnProcessor, FnSelector, Processor, Selector};

pub use rmodel_config::{BrainConfig, CastPolicy};
pub use rmodel_memory::{Memory, MemoryKey, MemoryValue};
pub use rmodel_state_manager::{BrainState, LinkState, NeuronState, StateEvent, StateEventReceiver};
