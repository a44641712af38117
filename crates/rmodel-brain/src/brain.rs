// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Brain lifecycle
//!
//! A [`Brain`] is one running instance of a [`Blueprint`]. It starts lazily
//! on the first trigger:
//!
//! ```text
//! Shutdown --start--> Sleeping --entry--> Running --quiescent--> Sleeping
//!     ^                   |                  |
//!     +-----shutdown------+------------------+
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use rmodel_config::{BrainConfig, RmodelConfig};
use rmodel_memory::{open_memory, InMemoryStore, Memory, MemoryKey, MemoryValue};
use rmodel_state_manager::{BrainState, BrainStateSignal, StateEventReceiver};

use crate::blueprint::Blueprint;
use crate::error::{BrainError, BrainResult};
use crate::event::{BrainAction, LinkAction, MaintainEvent, NeuronAction};
use crate::graph::{Graph, GraphStatus, LinkStatus, NeuronStatus, StateCounts};
use crate::maintainer::Maintainer;
use crate::runtime::{join_with_timeout, Publisher, Runtime};
use crate::worker::NeuronWorker;
use crate::LinkId;

/// State shared between the brain handle, the maintainer and the workers
pub(crate) struct BrainShared {
    pub(crate) id: String,
    pub(crate) config: BrainConfig,
    pub(crate) graph: Graph,
    pub(crate) status: RwLock<GraphStatus>,
    pub(crate) state: BrainStateSignal,
    pub(crate) memory: Arc<dyn Memory>,
    runtime: Mutex<Option<Runtime>>,
}

impl BrainShared {
    fn publisher(&self) -> Option<Publisher> {
        self.runtime.lock().as_ref().map(|rt| rt.publisher.clone())
    }

    /// Fire the close signal and set Shutdown.
    ///
    /// Returns the runtime threads if the brain was running.
    pub(crate) fn close(&self) -> Option<Vec<thread::JoinHandle<()>>> {
        let runtime = self.runtime.lock().take();
        let threads = runtime.map(Runtime::close);
        if self.state.get() != BrainState::Shutdown {
            self.state.set(BrainState::Shutdown);
            info!(brain_id = %self.id, "[BRAIN] Shut down");
        }
        threads
    }

    /// Reset every link to Init and every neuron to Inactive, then Sleeping.
    ///
    /// A brain that is shut down stays shut down.
    pub(crate) fn force_sleep(&self) {
        self.status.write().reset_states();
        self.state.transition(BrainState::Running, BrainState::Sleeping);
    }

    pub(crate) fn set_memory(&self, key: MemoryKey, value: MemoryValue) -> BrainResult<()> {
        Ok(self.memory.set(key, value)?)
    }

    pub(crate) fn get_memory(&self, key: &MemoryKey) -> BrainResult<Option<MemoryValue>> {
        Ok(self.memory.get(key)?)
    }

    pub(crate) fn exists_memory(&self, key: &MemoryKey) -> BrainResult<bool> {
        Ok(self.memory.exists(key)?)
    }

    pub(crate) fn delete_memory(&self, key: &MemoryKey) -> BrainResult<bool> {
        Ok(self.memory.delete(key)?)
    }

    pub(crate) fn clear_memory(&self) -> BrainResult<()> {
        Ok(self.memory.clear()?)
    }
}

/// A running instance of a blueprint
///
/// Dropping the brain shuts it down and closes its memory.
pub struct Brain {
    shared: Arc<BrainShared>,
}

impl Brain {
    /// Build a brain with default runtime settings and in-process memory
    pub fn new(blueprint: &Blueprint) -> BrainResult<Self> {
        Self::with_parts(
            blueprint,
            BrainConfig::default(),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Build a brain from a loaded configuration, opening the configured memory store
    pub fn from_config(blueprint: &Blueprint, config: &RmodelConfig) -> BrainResult<Self> {
        let id = Uuid::new_v4().to_string();
        let memory = open_memory(&config.memory, &id)?;
        Self::build(blueprint, id, config.brain.clone(), memory)
    }

    /// Build a brain with explicit runtime settings and memory
    pub fn with_parts(
        blueprint: &Blueprint,
        config: BrainConfig,
        memory: Arc<dyn Memory>,
    ) -> BrainResult<Self> {
        Self::build(blueprint, Uuid::new_v4().to_string(), config, memory)
    }

    fn build(
        blueprint: &Blueprint,
        id: String,
        config: BrainConfig,
        memory: Arc<dyn Memory>,
    ) -> BrainResult<Self> {
        if config.worker_num == 0 || config.neuron_queue_len == 0 || config.event_queue_len == 0 {
            return Err(BrainError::Runtime(format!(
                "worker_num, neuron_queue_len and event_queue_len must be at least 1 (got {}, {}, {})",
                config.worker_num, config.neuron_queue_len, config.event_queue_len
            )));
        }

        let graph = Graph::from_blueprint(blueprint);
        let status = GraphStatus::for_graph(&graph);
        info!(
            brain_id = %id,
            neurons = graph.neurons.len(),
            links = graph.links.len(),
            "[BRAIN] Built brain"
        );

        Ok(Self {
            shared: Arc::new(BrainShared {
                id,
                config,
                graph,
                status: RwLock::new(status),
                state: BrainStateSignal::new(),
                memory,
                runtime: Mutex::new(None),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn config(&self) -> &BrainConfig {
        &self.shared.config
    }

    /// Spawn the maintainer and the worker pool.
    ///
    /// Only takes effect when the brain is shut down; statuses are reset
    /// (counters are kept) and the brain ends up Sleeping.
    pub fn start(&self) -> BrainResult<()> {
        let mut runtime = self.shared.runtime.lock();
        if runtime.is_some() {
            return Ok(());
        }

        let config = &self.shared.config;
        self.shared.status.write().reset_states();

        let (events_tx, events_rx) = crossbeam::channel::bounded(config.event_queue_len);
        let (dispatch_tx, dispatch_rx) = crossbeam::channel::bounded(config.neuron_queue_len);
        let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(0);
        let publisher = Publisher::new(events_tx, done_rx);

        let mut threads = Vec::with_capacity(config.worker_num + 1);
        for worker_id in 0..config.worker_num {
            let worker = NeuronWorker::new(
                worker_id,
                Arc::clone(&self.shared),
                dispatch_rx.clone(),
                publisher.clone(),
            );
            let handle = thread::Builder::new()
                .name(format!("rmodel-neuron-worker-{}", worker_id))
                .spawn(move || worker.run())
                .map_err(|e| BrainError::Runtime(format!("Failed to spawn neuron worker: {}", e)))?;
            threads.push(handle);
        }

        let maintainer = Maintainer::new(
            Arc::clone(&self.shared),
            events_rx,
            dispatch_tx,
            publisher.clone(),
        );
        let handle = thread::Builder::new()
            .name("rmodel-maintainer".to_string())
            .spawn(move || maintainer.run())
            .map_err(|e| BrainError::Runtime(format!("Failed to spawn maintainer: {}", e)))?;
        threads.push(handle);

        // A caller that sees the runtime must never see Shutdown.
        self.shared.state.set(BrainState::Sleeping);
        *runtime = Some(Runtime {
            publisher,
            done_tx,
            threads,
        });
        drop(runtime);

        info!(
            brain_id = %self.shared.id,
            worker_num = config.worker_num,
            "[BRAIN] Started"
        );
        Ok(())
    }

    fn publish(&self, event: MaintainEvent) -> BrainResult<()> {
        let publisher = self
            .shared
            .publisher()
            .ok_or_else(|| BrainError::Runtime("brain is shut down".to_string()))?;
        if publisher.publish(event) {
            Ok(())
        } else {
            Err(BrainError::Runtime(
                "brain shut down before the event was queued".to_string(),
            ))
        }
    }

    /// Start if needed and mark Running before any trigger is queued, so a
    /// following `wait` cannot see the previous Sleeping state.
    fn begin_run(&self) -> BrainResult<()> {
        self.start()?;
        self.shared
            .state
            .transition(BrainState::Sleeping, BrainState::Running);
        Ok(())
    }

    /// Trigger every entry link
    pub fn entry(&self) -> BrainResult<()> {
        let entry_links: Vec<LinkId> = self.entry_link_ids().map(str::to_string).collect();

        if entry_links.is_empty() {
            warn!(brain_id = %self.shared.id, "[BRAIN] Entry called on a topology without entry links");
            return Ok(());
        }
        self.trig_links(&entry_links)
    }

    /// Write memory, then [`entry`](Self::entry)
    pub fn entry_with_memory<I, K, V>(&self, memories: I) -> BrainResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<MemoryKey>,
        V: Into<MemoryValue>,
    {
        for (key, value) in memories {
            self.set_memory(key, value)?;
        }
        self.entry()
    }

    /// Mark links Ready as if their source had cast.
    ///
    /// Every id is checked before anything is queued.
    pub fn trig_links<S: AsRef<str>>(&self, link_ids: &[S]) -> BrainResult<()> {
        for id in link_ids {
            if self.shared.graph.link_index(id.as_ref()).is_none() {
                return Err(BrainError::LinkNotFound(id.as_ref().to_string()));
            }
        }
        if link_ids.is_empty() {
            return Ok(());
        }

        self.begin_run()?;
        for id in link_ids {
            self.publish(MaintainEvent::link(LinkAction::Ready, id.as_ref()))?;
        }
        Ok(())
    }

    /// Force a neuron to cast again, even if its links were not armed.
    ///
    /// If a selected link is still Ready the cast is retried after
    /// `recast_backoff_ms`. A retry that fires after the brain went back to
    /// Sleeping still casts: it wakes the brain and its links may stay Ready
    /// until they are consumed, [`force_sleep`](Self::force_sleep) is called
    /// or the brain shuts down.
    pub fn recast(&self, neuron_id: &str) -> BrainResult<()> {
        if self.shared.graph.neuron_index(neuron_id).is_none() {
            return Err(BrainError::NeuronNotFound(neuron_id.to_string()));
        }
        self.begin_run()?;
        self.publish(MaintainEvent::neuron(NeuronAction::CastAnyway, neuron_id))
    }

    /// Block until the brain is no longer Running (Sleeping or Shutdown)
    pub fn wait(&self) -> BrainState {
        self.shared
            .state
            .wait_until(|state| state != BrainState::Running)
    }

    /// Like [`wait`](Self::wait); returns `false` if still Running after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared
            .state
            .wait_until_timeout(|state| state != BrainState::Running, timeout)
            .is_some()
    }

    /// Reset all links and neurons and put the brain to sleep
    pub fn force_sleep(&self) {
        self.shared.force_sleep();
    }

    /// Stop the maintainer and workers and set Shutdown.
    ///
    /// Safe to call repeatedly. Waits up to `shutdown_timeout_ms` for runtime
    /// threads; a processor that is still running is not interrupted.
    pub fn shutdown(&self) {
        if let Some(threads) = self.shared.close() {
            join_with_timeout(threads, self.shared.config.shutdown_timeout(), &self.shared.id);
        }
    }

    /// Queue a shutdown behind the events already queued
    pub fn request_shutdown(&self) -> BrainResult<()> {
        match self.shared.publisher() {
            Some(publisher) => {
                publisher.publish(MaintainEvent::brain(BrainAction::Shutdown));
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn state(&self) -> BrainState {
        self.shared.state.get()
    }

    /// Receive every brain state change from now on
    pub fn subscribe_state(&self) -> StateEventReceiver {
        self.shared.state.subscribe()
    }

    pub fn set_memory(
        &self,
        key: impl Into<MemoryKey>,
        value: impl Into<MemoryValue>,
    ) -> BrainResult<()> {
        self.shared.set_memory(key.into(), value.into())
    }

    pub fn get_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<Option<MemoryValue>> {
        self.shared.get_memory(&key.into())
    }

    pub fn exists_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<bool> {
        self.shared.exists_memory(&key.into())
    }

    pub fn delete_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<bool> {
        self.shared.delete_memory(&key.into())
    }

    pub fn clear_memory(&self) -> BrainResult<()> {
        self.shared.clear_memory()
    }

    pub fn neuron_status(&self, neuron_id: &str) -> Option<NeuronStatus> {
        let index = self.shared.graph.neuron_index(neuron_id)?;
        Some(self.shared.status.read().neurons[index])
    }

    pub fn link_status(&self, link_id: &str) -> Option<LinkStatus> {
        let index = self.shared.graph.link_index(link_id)?;
        Some(self.shared.status.read().links[index])
    }

    pub fn state_counts(&self) -> StateCounts {
        self.shared.status.read().state_counts()
    }

    pub fn neuron_ids(&self) -> impl Iterator<Item = &str> {
        self.shared.graph.neurons.iter().map(|n| n.id.as_str())
    }

    pub fn link_ids(&self) -> impl Iterator<Item = &str> {
        self.shared.graph.links.iter().map(|l| l.id.as_str())
    }

    pub fn entry_link_ids(&self) -> impl Iterator<Item = &str> {
        let graph = &self.shared.graph;
        graph.entry_links.iter().map(move |&i| graph.links[i].id.as_str())
    }
}

impl Drop for Brain {
    fn drop(&mut self) {
        self.shutdown();
        if let Err(e) = self.shared.memory.close() {
            warn!(brain_id = %self.shared.id, error = %e, "[BRAIN] Failed to close memory");
        }
    }
}

impl std::fmt::Debug for Brain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brain")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state.get())
            .finish()
    }
}
