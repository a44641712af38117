// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Event streaming for state changes

use crate::BrainState;

/// State change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    BrainStateChanged {
        from: BrainState,
        to: BrainState,
        /// Monotonic write counter of the signal that produced the event
        version: u64,
    },
}

/// Receiving half handed out by [`crate::BrainStateSignal::subscribe`]
pub type StateEventReceiver = crossbeam::channel::Receiver<StateEvent>;

/// Sending half kept by the signal
pub(crate) type StateEventSender = crossbeam::channel::Sender<StateEvent>;
