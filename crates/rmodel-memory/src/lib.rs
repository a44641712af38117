// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! # rmodel-memory
//!
//! Per-brain key/value memory shared by every neuron of a brain.
//!
//! - [`MemoryValue`]: tagged value (string, integer, float, bool, JSON)
//! - [`MemoryKey`]: normalised key; equal integers of any width are one key
//! - [`InMemoryStore`]: default store, lives as long as the brain
//! - [`FileStore`]: JSON snapshot on disk, optionally kept after close
//!
//! ```rust
//! use rmodel_memory::{InMemoryStore, Memory, MemoryKey, MemoryValue};
//!
//! let store = InMemoryStore::new();
//! store.set(MemoryKey::from(7u8), MemoryValue::from("seven")).unwrap();
//! assert_eq!(
//!     store.get(&MemoryKey::from(7i64)).unwrap(),
//!     Some(MemoryValue::from("seven"))
//! );
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod file_store;
pub mod key;
pub mod store;
pub mod value;

use std::sync::Arc;

use rmodel_config::{MemoryBackend, MemoryConfig};

pub use file_store::FileStore;
pub use key::MemoryKey;
pub use store::InMemoryStore;
pub use value::MemoryValue;

/// Memory error types
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Unsupported memory key: {0}")]
    UnsupportedKey(String),

    #[error("Memory serialization failed: {0}")]
    Serialization(String),

    #[error("Memory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Memory store is closed")]
    Closed,
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Key/value store backing a brain's memory
///
/// Implementations are shared between the brain handle and every worker
/// thread, so all methods take `&self`.
pub trait Memory: Send + Sync {
    /// Insert or replace a value
    fn set(&self, key: MemoryKey, value: MemoryValue) -> MemoryResult<()>;

    /// `Ok(None)` when the key is absent
    fn get(&self, key: &MemoryKey) -> MemoryResult<Option<MemoryValue>>;

    fn exists(&self, key: &MemoryKey) -> MemoryResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns whether the key was present
    fn delete(&self, key: &MemoryKey) -> MemoryResult<bool>;

    fn clear(&self) -> MemoryResult<()>;

    /// Release the store; later calls fail with [`MemoryError::Closed`]
    fn close(&self) -> MemoryResult<()>;
}

/// Open the store selected by `config` for one brain
pub fn open_memory(config: &MemoryConfig, brain_id: &str) -> MemoryResult<Arc<dyn Memory>> {
    match config.backend {
        MemoryBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        MemoryBackend::File => {
            let path = config.data_dir.join(format!("{}.json", brain_id));
            Ok(Arc::new(FileStore::open(path, config.keep_memory)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_default_backend() {
        let memory = open_memory(&MemoryConfig::default(), "brain-a").unwrap();
        memory.set("k".into(), 1i64.into()).unwrap();
        assert!(memory.exists(&"k".into()).unwrap());
    }

    #[test]
    fn test_open_file_backend_uses_brain_id() {
        let dir = tempdir().unwrap();
        let config = MemoryConfig {
            backend: MemoryBackend::File,
            data_dir: dir.path().to_path_buf(),
            keep_memory: true,
        };

        let memory = open_memory(&config, "brain-b").unwrap();
        memory.set("k".into(), true.into()).unwrap();
        memory.close().unwrap();

        assert!(dir.path().join("brain-b.json").exists());
    }
}
