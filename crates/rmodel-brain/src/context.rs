// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Contexts handed to processors and selectors
//!
//! A context is scoped to one brain and one neuron. Selectors get the
//! read-only [`BrainContextReader`]; processors get [`BrainContext`], which
//! can also write memory and run nested brains.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use rmodel_config::BrainConfig;
use rmodel_memory::{InMemoryStore, MemoryKey, MemoryValue};

use crate::blueprint::Blueprint;
use crate::brain::{Brain, BrainShared};
use crate::error::BrainResult;
use crate::graph::NeuronSpec;

/// Read-only view of the running brain
pub struct BrainContextReader<'a> {
    shared: &'a BrainShared,
    neuron: &'a NeuronSpec,
}

impl<'a> BrainContextReader<'a> {
    pub(crate) fn new(shared: &'a BrainShared, neuron: &'a NeuronSpec) -> Self {
        Self { shared, neuron }
    }

    pub fn brain_id(&self) -> &str {
        &self.shared.id
    }

    pub fn current_neuron_id(&self) -> &str {
        &self.neuron.id
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.neuron.labels
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.neuron.labels.get(key).map(String::as_str)
    }

    pub fn get_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<Option<MemoryValue>> {
        self.shared.get_memory(&key.into())
    }

    pub fn exists_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<bool> {
        self.shared.exists_memory(&key.into())
    }
}

/// Context passed to [`Processor::process`](crate::Processor::process)
pub struct BrainContext<'a> {
    reader: BrainContextReader<'a>,
}

impl<'a> BrainContext<'a> {
    pub(crate) fn new(shared: &'a BrainShared, neuron: &'a NeuronSpec) -> Self {
        Self {
            reader: BrainContextReader::new(shared, neuron),
        }
    }

    pub fn set_memory(
        &self,
        key: impl Into<MemoryKey>,
        value: impl Into<MemoryValue>,
    ) -> BrainResult<()> {
        self.reader.shared.set_memory(key.into(), value.into())
    }

    pub fn delete_memory(&self, key: impl Into<MemoryKey>) -> BrainResult<bool> {
        self.reader.shared.delete_memory(&key.into())
    }

    pub fn clear_memory(&self) -> BrainResult<()> {
        self.reader.shared.clear_memory()
    }

    /// Runtime settings of the brain this neuron belongs to
    pub fn brain_config(&self) -> &BrainConfig {
        &self.reader.shared.config
    }

    /// Build a nested brain with this brain's runtime settings and its own
    /// in-memory store
    pub fn new_brain(&self, blueprint: &Blueprint) -> BrainResult<Brain> {
        Brain::with_parts(
            blueprint,
            self.brain_config().clone(),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Build a nested brain, enter it and block until it sleeps.
    ///
    /// The returned brain still holds its memory for the caller to read.
    pub fn run_brain(&self, blueprint: &Blueprint) -> BrainResult<Brain> {
        let brain = self.new_brain(blueprint)?;
        brain.entry()?;
        brain.wait();
        Ok(brain)
    }
}

impl<'a> Deref for BrainContext<'a> {
    type Target = BrainContextReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}
