// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Topology builder
//!
//! A blueprint describes neurons, links and their groups. It is never run
//! directly; every [`Brain`](crate::Brain) built from it gets cloned
//! processors and selectors.
//!
//! Group defaults:
//! - each in-link of a neuron is its own trigger group (any one fires the neuron)
//! - each out-link belongs to [`DEFAULT_CAST_GROUP`]
//!
//! [`Blueprint::add_trigger_group`] turns several in-links into an AND-join;
//! [`Blueprint::add_cast_group`] moves out-links into a named group that a
//! selector can pick.

use std::collections::BTreeMap;

use ahash::AHashMap;
use uuid::Uuid;

use crate::error::{BrainError, BrainResult, ProcessorResult};
use crate::processor::{EmptyProcessor, FnProcessor, FnSelector, Processor, Selector};
use crate::{
    BrainContext, BrainContextReader, LinkId, NeuronId, DEFAULT_CAST_GROUP, END_NEURON_ID,
    ENTRY_LINK_FROM,
};

pub(crate) struct NeuronBlueprint {
    pub(crate) id: NeuronId,
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) processor: Box<dyn Processor>,
    pub(crate) selector: Option<Box<dyn Selector>>,
    pub(crate) trigger_groups: Vec<Vec<LinkId>>,
    pub(crate) cast_groups: BTreeMap<String, Vec<LinkId>>,
}

#[derive(Debug, Clone)]
pub(crate) struct LinkBlueprint {
    pub(crate) id: LinkId,
    pub(crate) from: NeuronId,
    pub(crate) to: NeuronId,
}

#[derive(Default)]
pub struct Blueprint {
    pub(crate) neurons: Vec<NeuronBlueprint>,
    neuron_index: AHashMap<NeuronId, usize>,
    pub(crate) links: Vec<LinkBlueprint>,
    link_index: AHashMap<LinkId, usize>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a neuron with a generated id
    pub fn add_neuron(&mut self, processor: impl Processor + 'static) -> NeuronId {
        let id = Uuid::new_v4().to_string();
        self.insert_neuron(id.clone(), Box::new(processor));
        id
    }

    /// Add a neuron whose body is a closure
    pub fn add_neuron_fn<F>(&mut self, process_fn: F) -> NeuronId
    where
        F: Fn(&BrainContext<'_>) -> ProcessorResult + Send + Sync + 'static,
    {
        self.add_neuron(FnProcessor::new(process_fn))
    }

    /// Add a neuron with a caller-chosen id
    pub fn add_neuron_with_id(
        &mut self,
        id: impl Into<NeuronId>,
        processor: impl Processor + 'static,
    ) -> BrainResult<NeuronId> {
        let id = id.into();
        if id.is_empty() || id == END_NEURON_ID || id == ENTRY_LINK_FROM {
            return Err(BrainError::InvalidTopology(format!(
                "neuron id '{}' is reserved",
                id
            )));
        }
        if self.neuron_index.contains_key(&id) {
            return Err(BrainError::InvalidTopology(format!(
                "neuron '{}' already exists",
                id
            )));
        }
        self.insert_neuron(id.clone(), Box::new(processor));
        Ok(id)
    }

    fn insert_neuron(&mut self, id: NeuronId, processor: Box<dyn Processor>) {
        self.neuron_index.insert(id.clone(), self.neurons.len());
        self.neurons.push(NeuronBlueprint {
            id,
            labels: BTreeMap::new(),
            processor,
            selector: None,
            trigger_groups: Vec::new(),
            cast_groups: BTreeMap::new(),
        });
    }

    fn neuron_mut(&mut self, id: &str) -> BrainResult<&mut NeuronBlueprint> {
        match self.neuron_index.get(id) {
            Some(&index) => Ok(&mut self.neurons[index]),
            None => Err(BrainError::NeuronNotFound(id.to_string())),
        }
    }

    /// Merge labels into a neuron; existing keys are overwritten
    pub fn set_labels<I, K, V>(&mut self, neuron: &str, labels: I) -> BrainResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let target = self.neuron_mut(neuron)?;
        for (key, value) in labels {
            target.labels.insert(key.into(), value.into());
        }
        Ok(())
    }

    pub fn bind_selector(
        &mut self,
        neuron: &str,
        selector: impl Selector + 'static,
    ) -> BrainResult<()> {
        self.neuron_mut(neuron)?.selector = Some(Box::new(selector));
        Ok(())
    }

    pub fn bind_select_fn<F>(&mut self, neuron: &str, select_fn: F) -> BrainResult<()>
    where
        F: Fn(&BrainContextReader<'_>) -> String + Send + Sync + 'static,
    {
        self.bind_selector(neuron, FnSelector::new(select_fn))
    }

    /// Link `src` to `dest`
    ///
    /// `src` must exist. `dest` is only resolved when the link becomes Ready
    /// at runtime; an unknown destination is reported then.
    pub fn add_link(&mut self, src: &str, dest: &str) -> BrainResult<LinkId> {
        if !self.neuron_index.contains_key(src) {
            return Err(BrainError::NeuronNotFound(src.to_string()));
        }
        if src == END_NEURON_ID {
            return Err(BrainError::InvalidTopology(
                "the end neuron has no outgoing links".to_string(),
            ));
        }
        Ok(self.insert_link(src, dest))
    }

    /// Link the entry pseudo-node to `dest`
    pub fn add_entry_link_to(&mut self, dest: &str) -> BrainResult<LinkId> {
        if !self.neuron_index.contains_key(dest) {
            return Err(BrainError::NeuronNotFound(dest.to_string()));
        }
        Ok(self.insert_link(ENTRY_LINK_FROM, dest))
    }

    /// Link `src` to the end neuron, creating it on first use.
    ///
    /// When the end neuron's trigger condition is met the brain goes to sleep
    /// without running anything.
    pub fn add_end_link_from(&mut self, src: &str) -> BrainResult<LinkId> {
        if !self.neuron_index.contains_key(END_NEURON_ID) {
            self.insert_neuron(END_NEURON_ID.to_string(), Box::new(EmptyProcessor));
        }
        self.add_link(src, END_NEURON_ID)
    }

    fn insert_link(&mut self, from: &str, to: &str) -> LinkId {
        let id = Uuid::new_v4().to_string();
        self.link_index.insert(id.clone(), self.links.len());
        self.links.push(LinkBlueprint {
            id: id.clone(),
            from: from.to_string(),
            to: to.to_string(),
        });
        id
    }

    fn link(&self, id: &str) -> BrainResult<&LinkBlueprint> {
        self.link_index
            .get(id)
            .map(|&index| &self.links[index])
            .ok_or_else(|| BrainError::LinkNotFound(id.to_string()))
    }

    /// Declare an AND-join: `neuron` fires once every link in `links` is Ready.
    ///
    /// Member links stop triggering the neuron on their own.
    pub fn add_trigger_group(&mut self, neuron: &str, links: &[LinkId]) -> BrainResult<()> {
        if links.is_empty() {
            return Err(BrainError::InvalidTopology(format!(
                "empty trigger group for neuron '{}'",
                neuron
            )));
        }
        for link_id in links {
            let link = self.link(link_id)?;
            if link.to != neuron {
                return Err(BrainError::InvalidTopology(format!(
                    "link '{}' does not end at neuron '{}'",
                    link_id, neuron
                )));
            }
        }
        self.neuron_mut(neuron)?.trigger_groups.push(links.to_vec());
        Ok(())
    }

    /// Move out-links of `neuron` into the cast group `name`
    pub fn add_cast_group(
        &mut self,
        neuron: &str,
        name: &str,
        links: &[LinkId],
    ) -> BrainResult<()> {
        if name == DEFAULT_CAST_GROUP {
            return Err(BrainError::InvalidTopology(format!(
                "cast group name '{}' is reserved",
                name
            )));
        }
        for link_id in links {
            let link = self.link(link_id)?;
            if link.from != neuron {
                return Err(BrainError::InvalidTopology(format!(
                    "link '{}' does not start at neuron '{}'",
                    link_id, neuron
                )));
            }
        }

        let target = self.neuron_mut(neuron)?;
        let taken = target
            .cast_groups
            .iter()
            .filter(|(group, _)| group.as_str() != name)
            .flat_map(|(_, members)| members.iter())
            .find(|member| links.contains(member));
        if let Some(link_id) = taken {
            return Err(BrainError::InvalidTopology(format!(
                "link '{}' already belongs to another cast group",
                link_id
            )));
        }

        let group = target.cast_groups.entry(name.to_string()).or_default();
        for link_id in links {
            if !group.contains(link_id) {
                group.push(link_id.clone());
            }
        }
        Ok(())
    }

    pub fn neuron_ids(&self) -> impl Iterator<Item = &str> {
        self.neurons.iter().map(|n| n.id.as_str())
    }

    pub fn link_ids(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.id.as_str())
    }

    pub fn entry_link_ids(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .filter(|l| l.from == ENTRY_LINK_FROM)
            .map(|l| l.id.as_str())
    }

    /// `(src, dest)` of a link
    pub fn link_endpoints(&self, id: &str) -> Option<(&str, &str)> {
        self.link(id).ok().map(|l| (l.from.as_str(), l.to.as_str()))
    }

    pub fn has_neuron(&self, id: &str) -> bool {
        self.neuron_index.contains_key(id)
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
