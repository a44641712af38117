// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for brains and processors

use rmodel_memory::MemoryError;

/// Brain error types
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    #[error("Neuron not found: {0}")]
    NeuronNotFound(String),

    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("Unsupported {kind} action: {action}")]
    UnsupportedAction { kind: &'static str, action: String },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type BrainResult<T> = Result<T, BrainError>;

/// Error returned by user processors
///
/// `?` works on brain, memory and boxed errors inside a processor; anything
/// else can be wrapped with [`ProcessorError::other`] or [`ProcessorError::msg`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Brain(Box<BrainError>),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("processor panicked: {0}")]
    Panicked(String),
}

impl ProcessorError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        ProcessorError::Message(message.to_string())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ProcessorError::Other(Box::new(err))
    }
}

impl From<BrainError> for ProcessorError {
    fn from(err: BrainError) -> Self {
        ProcessorError::Brain(Box::new(err))
    }
}

impl From<String> for ProcessorError {
    fn from(message: String) -> Self {
        ProcessorError::Message(message)
    }
}

impl From<&str> for ProcessorError {
    fn from(message: &str) -> Self {
        ProcessorError::Message(message.to_string())
    }
}

pub type ProcessorResult = Result<(), ProcessorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_error_from_io() {
        fn read() -> ProcessorResult {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
            Err(ProcessorError::other(err))
        }
        assert_eq!(read().unwrap_err().to_string(), "disk gone");
    }

    #[test]
    fn test_brain_error_in_processor() {
        fn lookup() -> ProcessorResult {
            Err::<(), _>(BrainError::NeuronNotFound("n1".to_string()))?;
            Ok(())
        }
        assert!(matches!(lookup(), Err(ProcessorError::Brain(_))));
        assert_eq!(lookup().unwrap_err().to_string(), "Neuron not found: n1");
    }

    #[test]
    fn test_unsupported_action_display() {
        let err = BrainError::UnsupportedAction {
            kind: "neuron",
            action: "TryCast".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported neuron action: TryCast");
    }
}
