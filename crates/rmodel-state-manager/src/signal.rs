// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Broadcast state holder
//!
//! Every write bumps a version and wakes all blocked waiters. Waiters always
//! re-check their predicate after waking, so a stale or spurious wake-up
//! (e.g. observing `Running` right after a broadcast) just keeps them waiting.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::events::StateEventSender;
use crate::{BrainState, StateEvent, StateEventReceiver};

struct SignalInner {
    state: BrainState,
    version: u64,
}

/// Mutex-protected brain state with a broadcast condition
pub struct BrainStateSignal {
    /// Lock-free mirror of `inner.state` for hot-path reads
    current: AtomicU8,
    inner: Mutex<SignalInner>,
    changed: Condvar,
    subscribers: Mutex<Vec<StateEventSender>>,
}

impl BrainStateSignal {
    /// Create a signal in the `Shutdown` state
    pub fn new() -> Self {
        Self {
            current: AtomicU8::new(BrainState::Shutdown as u8),
            inner: Mutex::new(SignalInner {
                state: BrainState::Shutdown,
                version: 0,
            }),
            changed: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Current state (lock-free)
    pub fn get(&self) -> BrainState {
        BrainState::try_from(self.current.load(Ordering::Acquire)).unwrap_or(BrainState::Shutdown)
    }

    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Write a state and wake every waiter. Returns the previous state.
    pub fn set(&self, state: BrainState) -> BrainState {
        let (previous, version) = {
            let mut inner = self.inner.lock();
            let previous = inner.state;
            inner.state = state;
            inner.version += 1;
            self.current.store(state as u8, Ordering::Release);
            self.changed.notify_all();
            (previous, inner.version)
        };

        trace!(from = %previous, to = %state, version, "brain state written");
        self.publish(StateEvent::BrainStateChanged {
            from: previous,
            to: state,
            version,
        });
        previous
    }

    /// Write `to` only if the current state is `expected`.
    ///
    /// The check and the write happen under one lock acquisition.
    pub fn transition(&self, expected: BrainState, to: BrainState) -> bool {
        let version = {
            let mut inner = self.inner.lock();
            if inner.state != expected {
                return false;
            }
            inner.state = to;
            inner.version += 1;
            self.current.store(to as u8, Ordering::Release);
            self.changed.notify_all();
            inner.version
        };

        self.publish(StateEvent::BrainStateChanged {
            from: expected,
            to,
            version,
        });
        true
    }

    /// Block until `predicate` holds and return the state that satisfied it
    pub fn wait_until<F>(&self, predicate: F) -> BrainState
    where
        F: Fn(BrainState) -> bool,
    {
        let mut inner = self.inner.lock();
        while !predicate(inner.state) {
            self.changed.wait(&mut inner);
        }
        inner.state
    }

    /// Like [`wait_until`](Self::wait_until) but gives up after `timeout`.
    ///
    /// Returns `None` if the predicate still does not hold at the deadline.
    pub fn wait_until_timeout<F>(&self, predicate: F, timeout: Duration) -> Option<BrainState>
    where
        F: Fn(BrainState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if predicate(inner.state) {
                return Some(inner.state);
            }
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                return predicate(inner.state).then_some(inner.state);
            }
        }
    }

    /// Subscribe to state change events.
    ///
    /// Subscribers whose receiver was dropped are pruned on the next write.
    pub fn subscribe(&self) -> StateEventReceiver {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, event: StateEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for BrainStateSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BrainStateSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrainStateSignal")
            .field("state", &self.get())
            .field("version", &self.version())
            .finish()
    }
}
