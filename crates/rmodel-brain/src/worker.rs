// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Neuron workers
//!
//! A worker pulls neuron indices from the dispatch queue, runs the processor
//! and reports the outcome to the maintainer. Workers never touch graph
//! status; the maintainer already marked the neuron Activated.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::Receiver;
use crossbeam::select;
use tracing::{debug, error, trace};

use crate::brain::BrainShared;
use crate::context::BrainContext;
use crate::error::ProcessorError;
use crate::event::{MaintainEvent, NeuronAction};
use crate::runtime::Publisher;

pub(crate) struct NeuronWorker {
    worker_id: usize,
    shared: Arc<BrainShared>,
    dispatch_rx: Receiver<usize>,
    publisher: Publisher,
}

impl NeuronWorker {
    pub(crate) fn new(
        worker_id: usize,
        shared: Arc<BrainShared>,
        dispatch_rx: Receiver<usize>,
        publisher: Publisher,
    ) -> Self {
        Self {
            worker_id,
            shared,
            dispatch_rx,
            publisher,
        }
    }

    pub(crate) fn run(self) {
        trace!(brain_id = %self.shared.id, worker_id = self.worker_id, "[NEURON-WORKER] Started");

        loop {
            select! {
                recv(self.dispatch_rx) -> msg => match msg {
                    Ok(index) => self.run_neuron(index),
                    Err(_) => break,
                },
                recv(self.publisher.done_rx()) -> _ => break,
            }
        }

        trace!(brain_id = %self.shared.id, worker_id = self.worker_id, "[NEURON-WORKER] Stopped");
    }

    fn run_neuron(&self, index: usize) {
        let neuron = &self.shared.graph.neurons[index];
        debug!(neuron_id = %neuron.id, worker_id = self.worker_id, "[NEURON-WORKER] Processing neuron");

        let ctx = BrainContext::new(&self.shared, neuron);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| neuron.processor.lock().process(&ctx)))
            .unwrap_or_else(|payload| Err(ProcessorError::Panicked(panic_message(payload.as_ref()))));

        let success = match outcome {
            Ok(()) => true,
            Err(e) => {
                error!(
                    brain_id = %self.shared.id,
                    neuron_id = %neuron.id,
                    error = %e,
                    "[NEURON-WORKER] Processor failed"
                );
                false
            }
        };

        let finished = MaintainEvent::neuron(NeuronAction::Finished { success }, neuron.id.clone());
        if !self.publisher.publish(finished) {
            debug!(neuron_id = %neuron.id, "[NEURON-WORKER] Brain closed before the result was reported");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
