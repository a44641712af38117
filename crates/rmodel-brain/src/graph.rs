// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Graph model
//!
//! [`Graph`] is the immutable topology of one brain: neurons, links and
//! resolved group membership (as link indices). [`GraphStatus`] holds the
//! runtime side: states and counters, mutated by the maintainer only.

use std::collections::BTreeMap;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use rmodel_state_manager::{LinkState, NeuronState};

use crate::blueprint::Blueprint;
use crate::processor::{Processor, Selector};
use crate::{LinkId, NeuronId, DEFAULT_CAST_GROUP, END_NEURON_ID, ENTRY_LINK_FROM};

pub(crate) struct CastGroup {
    pub(crate) name: String,
    pub(crate) links: Vec<usize>,
}

pub(crate) struct NeuronSpec {
    pub(crate) id: NeuronId,
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) processor: Mutex<Box<dyn Processor>>,
    pub(crate) selector: Option<Box<dyn Selector>>,
    pub(crate) trigger_groups: Vec<Vec<usize>>,
    pub(crate) cast_groups: Vec<CastGroup>,
}

impl NeuronSpec {
    pub(crate) fn is_end(&self) -> bool {
        self.id == END_NEURON_ID
    }

    pub(crate) fn trigger_links(&self) -> impl Iterator<Item = usize> + '_ {
        self.trigger_groups.iter().flatten().copied()
    }

    pub(crate) fn cast_links(&self) -> impl Iterator<Item = usize> + '_ {
        self.cast_groups.iter().flat_map(|g| g.links.iter().copied())
    }
}

pub(crate) struct LinkSpec {
    pub(crate) id: LinkId,
    pub(crate) from: NeuronId,
    pub(crate) to: NeuronId,
}

pub(crate) struct Graph {
    pub(crate) neurons: Vec<NeuronSpec>,
    pub(crate) links: Vec<LinkSpec>,
    neuron_index: AHashMap<NeuronId, usize>,
    link_index: AHashMap<LinkId, usize>,
    pub(crate) entry_links: Vec<usize>,
}

impl Graph {
    /// Resolve a blueprint into a graph with freshly cloned processors
    pub(crate) fn from_blueprint(blueprint: &Blueprint) -> Self {
        let links: Vec<LinkSpec> = blueprint
            .links
            .iter()
            .map(|l| LinkSpec {
                id: l.id.clone(),
                from: l.from.clone(),
                to: l.to.clone(),
            })
            .collect();
        let link_index: AHashMap<LinkId, usize> = links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.clone(), i))
            .collect();
        let resolve = |ids: &[LinkId]| -> Vec<usize> {
            ids.iter().filter_map(|id| link_index.get(id).copied()).collect()
        };

        let mut neurons = Vec::with_capacity(blueprint.neurons.len());
        for nb in &blueprint.neurons {
            let in_links: Vec<usize> = links
                .iter()
                .enumerate()
                .filter(|(_, l)| l.to == nb.id)
                .map(|(i, _)| i)
                .collect();
            let out_links: Vec<usize> = links
                .iter()
                .enumerate()
                .filter(|(_, l)| l.from == nb.id)
                .map(|(i, _)| i)
                .collect();

            let mut trigger_groups: Vec<Vec<usize>> =
                nb.trigger_groups.iter().map(|g| resolve(g.as_slice())).collect();
            let grouped: Vec<usize> = trigger_groups.iter().flatten().copied().collect();
            trigger_groups.extend(
                in_links
                    .iter()
                    .filter(|i| !grouped.contains(i))
                    .map(|&i| vec![i]),
            );

            let mut cast_groups: Vec<CastGroup> = nb
                .cast_groups
                .iter()
                .map(|(name, ids)| CastGroup {
                    name: name.clone(),
                    links: resolve(ids.as_slice()),
                })
                .collect();
            let named: Vec<usize> = cast_groups
                .iter()
                .flat_map(|g| g.links.iter().copied())
                .collect();
            cast_groups.push(CastGroup {
                name: DEFAULT_CAST_GROUP.to_string(),
                links: out_links
                    .iter()
                    .copied()
                    .filter(|i| !named.contains(i))
                    .collect(),
            });

            neurons.push(NeuronSpec {
                id: nb.id.clone(),
                labels: nb.labels.clone(),
                processor: Mutex::new(nb.processor.clone_box()),
                selector: nb.selector.as_ref().map(|s| s.clone_box()),
                trigger_groups,
                cast_groups,
            });
        }

        let neuron_index = neurons
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let entry_links = links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.from == ENTRY_LINK_FROM)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        for link in &links {
            if link.to != END_NEURON_ID && !blueprint.has_neuron(&link.to) {
                warn!(link_id = %link.id, dest = %link.to, "[BRAIN] Link points at an unknown neuron");
            }
        }

        Graph {
            neurons,
            links,
            neuron_index,
            link_index,
            entry_links,
        }
    }

    pub(crate) fn neuron_index(&self, id: &str) -> Option<usize> {
        self.neuron_index.get(id).copied()
    }

    pub(crate) fn link_index(&self, id: &str) -> Option<usize> {
        self.link_index.get(id).copied()
    }
}

/// Activity counters shared by neurons and links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Snapshot of one neuron's runtime status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NeuronStatus {
    pub state: NeuronState,
    pub counters: Counters,
}

/// Snapshot of one link's runtime status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub state: LinkState,
    pub counters: Counters,
}

/// Runtime status of a whole graph, indexed like [`Graph`]
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphStatus {
    pub(crate) neurons: Vec<NeuronStatus>,
    pub(crate) links: Vec<LinkStatus>,
}

impl GraphStatus {
    pub(crate) fn for_graph(graph: &Graph) -> Self {
        Self {
            neurons: vec![NeuronStatus::default(); graph.neurons.len()],
            links: vec![LinkStatus::default(); graph.links.len()],
        }
    }

    /// Every link back to Init and every neuron back to Inactive; counters stay
    pub(crate) fn reset_states(&mut self) {
        for link in &mut self.links {
            link.state = LinkState::Init;
        }
        for neuron in &mut self.neurons {
            neuron.state = NeuronState::Inactive;
        }
    }

    /// No neuron Activated and no link in Wait or Ready
    pub(crate) fn is_quiescent(&self) -> bool {
        self.neurons.iter().all(|n| n.state == NeuronState::Inactive)
            && self.links.iter().all(|l| l.state == LinkState::Init)
    }

    pub(crate) fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for neuron in &self.neurons {
            match neuron.state {
                NeuronState::Inactive => counts.neuron_inactive += 1,
                NeuronState::Activated => counts.neuron_activated += 1,
            }
        }
        for link in &self.links {
            match link.state {
                LinkState::Init => counts.link_init += 1,
                LinkState::Wait => counts.link_wait += 1,
                LinkState::Ready => counts.link_ready += 1,
            }
        }
        counts
    }

    /// Whether any trigger group of `neuron` has every link Ready
    pub(crate) fn any_group_satisfied(&self, neuron: &NeuronSpec) -> bool {
        neuron.trigger_groups.iter().any(|group| {
            let states: Vec<LinkState> = group.iter().map(|&i| self.links[i].state).collect();
            trigger_group_satisfied(&states)
        })
    }
}

/// Aggregate counts by state, logged on every refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub neuron_inactive: usize,
    pub neuron_activated: usize,
    pub link_init: usize,
    pub link_wait: usize,
    pub link_ready: usize,
}

/// A trigger group is satisfied iff it has at least one link and all of
/// them are Ready.
pub fn trigger_group_satisfied(states: &[LinkState]) -> bool {
    let mut ready = 0;
    for state in states {
        if *state != LinkState::Ready {
            break;
        }
        ready += 1;
    }
    !states.is_empty() && ready == states.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::EmptyProcessor;

    #[test]
    fn test_empty_group_never_satisfied() {
        assert!(!trigger_group_satisfied(&[]));
        assert!(trigger_group_satisfied(&[LinkState::Ready]));
        assert!(!trigger_group_satisfied(&[LinkState::Ready, LinkState::Wait]));
    }

    #[test]
    fn test_default_groups() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(EmptyProcessor);
        let b = bp.add_neuron(EmptyProcessor);
        let c = bp.add_neuron(EmptyProcessor);
        let ac = bp.add_link(&a, &c).unwrap();
        let bc = bp.add_link(&b, &c).unwrap();
        let ca = bp.add_link(&c, &a).unwrap();

        let graph = Graph::from_blueprint(&bp);
        let c_spec = &graph.neurons[graph.neuron_index(&c).unwrap()];

        assert_eq!(
            c_spec.trigger_groups,
            vec![
                vec![graph.link_index(&ac).unwrap()],
                vec![graph.link_index(&bc).unwrap()]
            ]
        );
        assert_eq!(c_spec.cast_groups.len(), 1);
        assert_eq!(c_spec.cast_groups[0].name, DEFAULT_CAST_GROUP);
        assert_eq!(c_spec.cast_groups[0].links, vec![graph.link_index(&ca).unwrap()]);
    }

    #[test]
    fn test_explicit_groups_replace_defaults() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(EmptyProcessor);
        let b = bp.add_neuron(EmptyProcessor);
        let c = bp.add_neuron(EmptyProcessor);
        let d = bp.add_neuron(EmptyProcessor);
        let ac = bp.add_link(&a, &c).unwrap();
        let bc = bp.add_link(&b, &c).unwrap();
        let cd = bp.add_link(&c, &d).unwrap();
        let cb = bp.add_link(&c, &b).unwrap();
        bp.add_trigger_group(&c, &[ac.clone(), bc.clone()]).unwrap();
        bp.add_cast_group(&c, "left", &[cd.clone()]).unwrap();

        let graph = Graph::from_blueprint(&bp);
        let c_spec = &graph.neurons[graph.neuron_index(&c).unwrap()];

        assert_eq!(c_spec.trigger_groups.len(), 1);
        assert_eq!(c_spec.trigger_groups[0].len(), 2);

        let left = c_spec.cast_groups.iter().find(|g| g.name == "left").unwrap();
        let default = c_spec
            .cast_groups
            .iter()
            .find(|g| g.name == DEFAULT_CAST_GROUP)
            .unwrap();
        assert_eq!(left.links, vec![graph.link_index(&cd).unwrap()]);
        assert_eq!(default.links, vec![graph.link_index(&cb).unwrap()]);
    }

    #[test]
    fn test_status_quiescence() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(EmptyProcessor);
        bp.add_entry_link_to(&a).unwrap();
        let graph = Graph::from_blueprint(&bp);
        let mut status = GraphStatus::for_graph(&graph);

        assert!(status.is_quiescent());
        status.links[0].state = LinkState::Wait;
        assert!(!status.is_quiescent());
        assert_eq!(status.state_counts().link_wait, 1);
        status.reset_states();
        assert!(status.is_quiescent());
    }
}
