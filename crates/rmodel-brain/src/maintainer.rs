// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! The maintainer: single consumer of brain events
//!
//! The maintainer is the only routine writer of graph status. It drains
//! events one at a time, so every state transition is ordered by the queue.
//!
//! Events the maintainer raises itself go to a local FIFO that is drained
//! before the shared queue, and dispatches that find the worker queue full
//! wait in a local pending FIFO. The maintainer therefore never blocks on a
//! queue that only it can drain.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender, TrySendError};
use crossbeam::select;
use tracing::{debug, error, info, trace, warn};

use rmodel_config::CastPolicy;
use rmodel_state_manager::{BrainState, LinkState, NeuronState};

use crate::brain::BrainShared;
use crate::context::BrainContextReader;
use crate::error::{BrainError, BrainResult};
use crate::event::{BrainAction, LinkAction, MaintainEvent, NeuronAction};
use crate::runtime::Publisher;
use crate::DEFAULT_CAST_GROUP;

pub(crate) struct Maintainer {
    shared: Arc<BrainShared>,
    events_rx: Receiver<MaintainEvent>,
    dispatch_tx: Sender<usize>,
    publisher: Publisher,
    local: VecDeque<MaintainEvent>,
    pending_dispatch: VecDeque<usize>,
    sleep_requested: bool,
}

impl Maintainer {
    pub(crate) fn new(
        shared: Arc<BrainShared>,
        events_rx: Receiver<MaintainEvent>,
        dispatch_tx: Sender<usize>,
        publisher: Publisher,
    ) -> Self {
        Self {
            shared,
            events_rx,
            dispatch_tx,
            publisher,
            local: VecDeque::new(),
            pending_dispatch: VecDeque::new(),
            sleep_requested: false,
        }
    }

    pub(crate) fn run(mut self) {
        info!(
            brain_id = %self.shared.id,
            worker_num = self.shared.config.worker_num,
            neuron_queue_len = self.shared.config.neuron_queue_len,
            "[MAINTAINER] Started"
        );

        while !self.publisher.is_closed() {
            if let Some(event) = self.local.pop_front() {
                if !self.maintain(event) {
                    break;
                }
                continue;
            }

            let event = if let Some(&index) = self.pending_dispatch.front() {
                select! {
                    send(self.dispatch_tx, index) -> res => {
                        if res.is_err() {
                            break;
                        }
                        self.pending_dispatch.pop_front();
                        continue;
                    }
                    recv(self.events_rx) -> msg => msg,
                    recv(self.publisher.done_rx()) -> _ => break,
                }
            } else {
                select! {
                    recv(self.events_rx) -> msg => msg,
                    recv(self.publisher.done_rx()) -> _ => break,
                }
            };

            match event {
                Ok(event) => {
                    if !self.maintain(event) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        debug!(brain_id = %self.shared.id, "[MAINTAINER] Stopped");
    }

    /// Handle one event. Returns `false` once the maintainer should stop.
    fn maintain(&mut self, event: MaintainEvent) -> bool {
        trace!(brain_id = %self.shared.id, %event, "[MAINTAINER] Event");

        let result = match &event {
            MaintainEvent::Link { action, id } => self.handle_link_event(*action, id),
            MaintainEvent::Neuron { action, id } => self.handle_neuron_event(*action, id),
            MaintainEvent::Brain { action } => return self.handle_brain_event(*action),
        };

        if let Err(e) = result {
            error!(brain_id = %self.shared.id, %event, error = %e, "[MAINTAINER] Dropped event");
        }

        // Status may have changed even when the handler failed part-way.
        self.refresh_state();
        true
    }

    fn publish_local(&mut self, event: MaintainEvent) {
        self.local.push_back(event);
    }

    fn request_sleep(&mut self) {
        if !self.sleep_requested {
            self.sleep_requested = true;
            self.publish_local(MaintainEvent::brain(BrainAction::Sleep));
        }
    }

    fn handle_link_event(&mut self, action: LinkAction, id: &str) -> BrainResult<()> {
        let shared = Arc::clone(&self.shared);
        let graph = &shared.graph;
        let index = graph
            .link_index(id)
            .ok_or_else(|| BrainError::LinkNotFound(id.to_string()))?;

        match action {
            LinkAction::Init | LinkAction::Wait => Ok(()),
            LinkAction::Ready => {
                let link = &graph.links[index];
                let dest = graph.neuron_index(&link.to);
                {
                    let mut status = shared.status.write();
                    let link_status = &mut status.links[index];
                    if link_status.state != LinkState::Ready {
                        link_status.state = LinkState::Ready;
                        link_status.counters.processed += 1;
                    }
                    if dest.is_none() {
                        link_status.state = LinkState::Init;
                        link_status.counters.failed += 1;
                    }
                }

                match dest {
                    Some(dest) => {
                        let dest_id = graph.neurons[dest].id.clone();
                        trace!(link_id = %id, neuron_id = %dest_id, "[MAINTAINER] Link ready");
                        self.publish_local(MaintainEvent::neuron(NeuronAction::TryActivate, dest_id));
                        Ok(())
                    }
                    None => Err(BrainError::NeuronNotFound(link.to.clone())),
                }
            }
        }
    }

    fn handle_neuron_event(&mut self, action: NeuronAction, id: &str) -> BrainResult<()> {
        let index = self
            .shared
            .graph
            .neuron_index(id)
            .ok_or_else(|| BrainError::NeuronNotFound(id.to_string()))?;

        let is_end = self.shared.graph.neurons[index].is_end();
        match action {
            NeuronAction::TryInactive => Ok(()),
            NeuronAction::TryActivate => {
                self.try_activate(index);
                Ok(())
            }
            _ if is_end => Err(BrainError::UnsupportedAction {
                kind: "neuron",
                action: format!("{} on the end neuron", action),
            }),
            NeuronAction::TryCast => self.neuron_cast(index, false),
            NeuronAction::CastAnyway => self.neuron_cast(index, true),
            NeuronAction::Finished { success } => {
                self.neuron_finished(index, success);
                Ok(())
            }
        }
    }

    /// Returns `false` when the brain was shut down
    fn handle_brain_event(&mut self, action: BrainAction) -> bool {
        match action {
            BrainAction::Sleep => {
                self.sleep_requested = false;
                self.shared.force_sleep();
                info!(brain_id = %self.shared.id, "[MAINTAINER] Brain is sleeping");
                true
            }
            BrainAction::Shutdown => {
                info!(brain_id = %self.shared.id, "[MAINTAINER] Shutdown requested");
                // Joining here would wait on this very thread; the handles are detached.
                drop(self.shared.close());
                false
            }
        }
    }

    fn try_activate(&mut self, index: usize) {
        let shared = Arc::clone(&self.shared);
        let neuron = &shared.graph.neurons[index];

        {
            let status = shared.status.read();
            if status.neurons[index].state == NeuronState::Activated {
                debug!(neuron_id = %neuron.id, "[MAINTAINER] Neuron already activated");
                return;
            }

            let state = shared.state.get();
            if state != BrainState::Running {
                debug!(neuron_id = %neuron.id, %state, "[MAINTAINER] Brain not running, neuron stays inactive");
                return;
            }

            if !status.any_group_satisfied(neuron) {
                debug!(neuron_id = %neuron.id, "[MAINTAINER] No trigger group satisfied");
                return;
            }
        }

        if neuron.is_end() {
            info!(brain_id = %shared.id, "[MAINTAINER] Arrived at the end neuron");
            self.request_sleep();
            return;
        }

        self.dispatch(index);
    }

    /// Mark the neuron Activated, consume its trigger links, arm its cast
    /// links and hand it to the worker pool.
    fn dispatch(&mut self, index: usize) {
        let shared = Arc::clone(&self.shared);
        let neuron = &shared.graph.neurons[index];

        {
            let mut status = shared.status.write();
            let neuron_status = &mut status.neurons[index];
            neuron_status.state = NeuronState::Activated;
            neuron_status.counters.processed += 1;

            for link in neuron.trigger_links() {
                let link_status = &mut status.links[link];
                if link_status.state == LinkState::Ready {
                    link_status.counters.succeeded += 1;
                }
                link_status.state = LinkState::Init;
            }
            for link in neuron.cast_links() {
                status.links[link].state = LinkState::Wait;
            }
        }

        debug!(neuron_id = %neuron.id, "[MAINTAINER] Dispatching neuron");

        if !self.pending_dispatch.is_empty() {
            self.pending_dispatch.push_back(index);
            return;
        }
        match self.dispatch_tx.try_send(index) {
            Ok(()) => {}
            Err(TrySendError::Full(index)) => self.pending_dispatch.push_back(index),
            Err(TrySendError::Disconnected(_)) => {
                warn!(neuron_id = %neuron.id, "[MAINTAINER] Worker queue closed, dispatch dropped")
            }
        }
    }

    fn neuron_finished(&mut self, index: usize, success: bool) {
        let shared = Arc::clone(&self.shared);
        let neuron = &shared.graph.neurons[index];
        let policy = shared.config.cast_policy;

        {
            let mut status = shared.status.write();
            let neuron_status = &mut status.neurons[index];
            neuron_status.state = NeuronState::Inactive;
            if success {
                neuron_status.counters.succeeded += 1;
            } else {
                neuron_status.counters.failed += 1;
            }

            if !success && policy == CastPolicy::OnSuccess {
                for link in neuron.cast_links() {
                    if status.links[link].state == LinkState::Wait {
                        status.links[link].state = LinkState::Init;
                    }
                }
            }
        }

        if success || policy == CastPolicy::Always {
            self.publish_local(MaintainEvent::neuron(NeuronAction::TryCast, neuron.id.clone()));
        } else {
            debug!(neuron_id = %neuron.id, "[MAINTAINER] Neuron failed, cast suppressed");
        }
    }

    /// Fan out along the selected cast group.
    ///
    /// Selected links: Wait -> Ready; Init -> Ready only when forced; a forced
    /// cast that finds a link still Ready retries after the back-off.
    /// Unselected links: Wait -> Init normally, everything -> Wait when forced.
    fn neuron_cast(&mut self, index: usize, force: bool) -> BrainResult<()> {
        let shared = Arc::clone(&self.shared);
        let neuron = &shared.graph.neurons[index];

        if !force && shared.status.read().neurons[index].state != NeuronState::Inactive {
            debug!(neuron_id = %neuron.id, "[MAINTAINER] Neuron busy, not casting");
            return Ok(());
        }

        let selected = match &neuron.selector {
            Some(selector) => selector.select(&BrainContextReader::new(&shared, neuron)),
            None => DEFAULT_CAST_GROUP.to_string(),
        };
        if !neuron.cast_groups.iter().any(|g| g.name == selected) {
            warn!(neuron_id = %neuron.id, group = %selected, "[MAINTAINER] Selector chose an unknown cast group");
        }

        let mut ready = Vec::new();
        let mut retry = false;
        {
            let mut status = shared.status.write();
            for group in &neuron.cast_groups {
                let is_selected = group.name == selected;
                for &link in &group.links {
                    let link_status = &mut status.links[link];
                    if is_selected {
                        match link_status.state {
                            LinkState::Wait => {
                                link_status.state = LinkState::Ready;
                                link_status.counters.processed += 1;
                                ready.push(link);
                            }
                            LinkState::Init if force => {
                                link_status.state = LinkState::Ready;
                                link_status.counters.processed += 1;
                                ready.push(link);
                            }
                            LinkState::Ready if force => retry = true,
                            LinkState::Init | LinkState::Ready => {}
                        }
                    } else if force {
                        link_status.state = LinkState::Wait;
                    } else if link_status.state == LinkState::Wait {
                        link_status.state = LinkState::Init;
                    }
                }
            }
        }

        debug!(
            neuron_id = %neuron.id,
            group = %selected,
            force,
            cast = ready.len(),
            "[MAINTAINER] Neuron cast"
        );

        for link in ready {
            let id = shared.graph.links[link].id.clone();
            self.publish_local(MaintainEvent::link(LinkAction::Ready, id));
        }
        if retry {
            self.schedule_recast(neuron.id.clone())?;
        }
        Ok(())
    }

    /// Publish CastAnyway for `neuron_id` after the back-off, off this thread
    fn schedule_recast(&self, neuron_id: String) -> BrainResult<()> {
        let publisher = self.publisher.clone();
        let delay = self.shared.config.recast_backoff();
        debug!(neuron_id = %neuron_id, ?delay, "[MAINTAINER] Link still ready, recast scheduled");

        thread::Builder::new()
            .name("rmodel-recast-timer".to_string())
            .spawn(move || {
                if publisher.sleep_unless_closed(delay) {
                    publisher.publish(MaintainEvent::neuron(NeuronAction::CastAnyway, neuron_id));
                }
            })
            .map(|_| ())
            .map_err(|e| BrainError::Runtime(format!("Failed to spawn recast timer: {}", e)))
    }

    /// Re-evaluate quiescence after a link or neuron event
    fn refresh_state(&mut self) {
        let state = self.shared.state.get();
        if state == BrainState::Shutdown {
            return;
        }

        let (quiescent, counts) = {
            let status = self.shared.status.read();
            (status.is_quiescent(), status.state_counts())
        };
        trace!(
            neuron_inactive = counts.neuron_inactive,
            neuron_activated = counts.neuron_activated,
            link_init = counts.link_init,
            link_wait = counts.link_wait,
            link_ready = counts.link_ready,
            "[MAINTAINER] Refreshed state counts"
        );

        if quiescent {
            if state != BrainState::Sleeping {
                self.request_sleep();
            }
        } else {
            self.shared.state.transition(BrainState::Sleeping, BrainState::Running);
        }
    }
}
