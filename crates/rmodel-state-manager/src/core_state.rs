// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! State enums for brains, neurons and links

use crate::StateError;

/// Brain state
///
/// `Shutdown` is both the initial and the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BrainState {
    Shutdown = 0,
    Sleeping = 1,
    Running = 2,
}

/// Neuron state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum NeuronState {
    #[default]
    Inactive = 0,
    Activated = 1,
}

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LinkState {
    #[default]
    Init = 0,
    Wait = 1,
    Ready = 2,
}

impl BrainState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrainState::Shutdown => "Shutdown",
            BrainState::Sleeping => "Sleeping",
            BrainState::Running => "Running",
        }
    }

    /// True while the maintainer and workers are alive
    pub fn is_alive(&self) -> bool {
        !matches!(self, BrainState::Shutdown)
    }
}

impl NeuronState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeuronState::Inactive => "Inactive",
            NeuronState::Activated => "Activated",
        }
    }
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Init => "Init",
            LinkState::Wait => "Wait",
            LinkState::Ready => "Ready",
        }
    }
}

impl TryFrom<u8> for BrainState {
    type Error = StateError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(BrainState::Shutdown),
            1 => Ok(BrainState::Sleeping),
            2 => Ok(BrainState::Running),
            _ => Err(StateError::InvalidState { kind: "brain", raw }),
        }
    }
}

impl TryFrom<u8> for NeuronState {
    type Error = StateError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(NeuronState::Inactive),
            1 => Ok(NeuronState::Activated),
            _ => Err(StateError::InvalidState { kind: "neuron", raw }),
        }
    }
}

impl TryFrom<u8> for LinkState {
    type Error = StateError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(LinkState::Init),
            1 => Ok(LinkState::Wait),
            2 => Ok(LinkState::Ready),
            _ => Err(StateError::InvalidState { kind: "link", raw }),
        }
    }
}

impl std::fmt::Display for BrainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for NeuronState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
