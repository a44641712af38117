// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Runtime plumbing shared by the maintainer, workers and timers
//!
//! A running brain owns one bounded event queue, one bounded dispatch queue
//! and a close signal. The close signal is a zero-capacity channel that never
//! carries a message: dropping its only sender disconnects every receiver,
//! which wakes every loop and every publisher blocked on a full queue.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use crossbeam::select;
use tracing::{info, warn};

use crate::event::MaintainEvent;

/// Handle for putting events on the maintainer queue
#[derive(Clone)]
pub(crate) struct Publisher {
    events_tx: Sender<MaintainEvent>,
    done_rx: Receiver<()>,
}

impl Publisher {
    pub(crate) fn new(events_tx: Sender<MaintainEvent>, done_rx: Receiver<()>) -> Self {
        Self { events_tx, done_rx }
    }

    /// Block until the event is queued or the brain closes.
    ///
    /// Returns `false` if the event was not queued.
    pub(crate) fn publish(&self, event: MaintainEvent) -> bool {
        select! {
            send(self.events_tx, event) -> res => res.is_ok(),
            recv(self.done_rx) -> _ => false,
        }
    }

    /// Sleep for `delay`; returns `false` early if the brain closes meanwhile
    pub(crate) fn sleep_unless_closed(&self, delay: Duration) -> bool {
        select! {
            recv(self.done_rx) -> _ => false,
            default(delay) => true,
        }
    }

    pub(crate) fn done_rx(&self) -> &Receiver<()> {
        &self.done_rx
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(
            self.done_rx.try_recv(),
            Err(crossbeam::channel::TryRecvError::Disconnected)
        )
    }
}

/// Everything that exists only while a brain is started
pub(crate) struct Runtime {
    pub(crate) publisher: Publisher,
    pub(crate) done_tx: Sender<()>,
    pub(crate) threads: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Fire the close signal and hand back the threads to join
    pub(crate) fn close(self) -> Vec<JoinHandle<()>> {
        drop(self.done_tx);
        self.threads
    }
}

/// Join runtime threads, giving up after `timeout`.
///
/// `JoinHandle` has no timed join, so a helper thread joins and reports back.
/// A handle for the calling thread is detached instead of joined.
pub(crate) fn join_with_timeout(threads: Vec<JoinHandle<()>>, timeout: Duration, brain_id: &str) {
    let current = thread::current().id();
    let threads: Vec<JoinHandle<()>> = threads
        .into_iter()
        .filter(|handle| handle.thread().id() != current)
        .collect();
    if threads.is_empty() {
        return;
    }

    let (tx, rx) = crossbeam::channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("rmodel-shutdown-join".to_string())
        .spawn(move || {
            let panicked = threads
                .into_iter()
                .map(JoinHandle::join)
                .filter(Result::is_err)
                .count();
            let _ = tx.send(panicked);
        });
    if let Err(e) = spawned {
        warn!(brain_id, error = %e, "[BRAIN] Failed to spawn join thread; runtime threads detached");
        return;
    }

    match rx.recv_timeout(timeout) {
        Ok(0) => info!(brain_id, "[BRAIN] Runtime threads stopped cleanly"),
        Ok(panicked) => warn!(brain_id, panicked, "[BRAIN] Runtime threads panicked during shutdown"),
        Err(RecvTimeoutError::Timeout) => warn!(
            brain_id,
            "[BRAIN] Runtime threads did not stop within {:?}, proceeding with shutdown",
            timeout
        ),
        Err(RecvTimeoutError::Disconnected) => {
            warn!(brain_id, "[BRAIN] Join thread disconnected unexpectedly")
        }
    }
}
