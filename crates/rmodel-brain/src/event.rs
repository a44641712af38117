// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Events consumed by the maintainer

use std::fmt;

use crate::{LinkId, NeuronId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Reserved
    Init,
    /// Reserved
    Wait,
    /// The link carries a signal; try to activate its destination
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeuronAction {
    /// Reserved; in-flight processors are never cancelled
    TryInactive,
    TryActivate,
    TryCast,
    /// Cast even if the neuron is busy or its links are not armed
    CastAnyway,
    /// A worker finished running the neuron's processor
    Finished { success: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainAction {
    Sleep,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintainEvent {
    Link { action: LinkAction, id: LinkId },
    Neuron { action: NeuronAction, id: NeuronId },
    Brain { action: BrainAction },
}

impl MaintainEvent {
    pub fn link(action: LinkAction, id: impl Into<LinkId>) -> Self {
        MaintainEvent::Link {
            action,
            id: id.into(),
        }
    }

    pub fn neuron(action: NeuronAction, id: impl Into<NeuronId>) -> Self {
        MaintainEvent::Neuron {
            action,
            id: id.into(),
        }
    }

    pub fn brain(action: BrainAction) -> Self {
        MaintainEvent::Brain { action }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MaintainEvent::Link { .. } => "link",
            MaintainEvent::Neuron { .. } => "neuron",
            MaintainEvent::Brain { .. } => "brain",
        }
    }
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for NeuronAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuronAction::Finished { success } => write!(f, "Finished(success={})", success),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl fmt::Display for BrainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for MaintainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintainEvent::Link { action, id } => write!(f, "link/{} {}", action, id),
            MaintainEvent::Neuron { action, id } => write!(f, "neuron/{} {}", action, id),
            MaintainEvent::Brain { action } => write!(f, "brain/{}", action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let event = MaintainEvent::neuron(NeuronAction::Finished { success: false }, "n1");
        assert_eq!(event.to_string(), "neuron/Finished(success=false) n1");
        assert_eq!(MaintainEvent::brain(BrainAction::Sleep).to_string(), "brain/Sleep");
        assert_eq!(MaintainEvent::link(LinkAction::Ready, "l1").kind(), "link");
    }
}
