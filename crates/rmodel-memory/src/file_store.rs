// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! File-backed memory store
//!
//! The whole store is a JSON object mapping canonical keys to tagged values.
//! Every mutation rewrites the snapshot (temp file, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Memory, MemoryError, MemoryKey, MemoryResult, MemoryValue};

#[derive(Debug)]
struct FileStoreInner {
    entries: BTreeMap<String, MemoryValue>,
    closed: bool,
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    keep_memory: bool,
    inner: Mutex<FileStoreInner>,
}

impl FileStore {
    /// Open the snapshot at `path`, loading it when it already exists
    ///
    /// With `keep_memory` the file survives [`Memory::close`], so a brain
    /// with the same id picks up where the previous one stopped.
    pub fn open(path: impl Into<PathBuf>, keep_memory: bool) -> MemoryResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "[MEMORY] Opened file store");

        let store = FileStore {
            path,
            keep_memory,
            inner: Mutex::new(FileStoreInner {
                entries,
                closed: false,
            }),
        };
        store.persist(&store.inner.lock().entries)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, MemoryValue>) -> MemoryResult<()> {
        let encoded = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut BTreeMap<String, MemoryValue>) -> R) -> MemoryResult<R> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MemoryError::Closed);
        }
        // Only a persisted snapshot replaces the live map.
        let mut entries = inner.entries.clone();
        let result = f(&mut entries);
        self.persist(&entries)?;
        inner.entries = entries;
        Ok(result)
    }
}

impl Memory for FileStore {
    fn set(&self, key: MemoryKey, value: MemoryValue) -> MemoryResult<()> {
        self.mutate(|entries| {
            entries.insert(key.canonical(), value);
        })
    }

    fn get(&self, key: &MemoryKey) -> MemoryResult<Option<MemoryValue>> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(MemoryError::Closed);
        }
        Ok(inner.entries.get(&key.canonical()).cloned())
    }

    fn delete(&self, key: &MemoryKey) -> MemoryResult<bool> {
        self.mutate(|entries| entries.remove(&key.canonical()).is_some())
    }

    fn clear(&self) -> MemoryResult<()> {
        self.mutate(|entries| entries.clear())
    }

    fn close(&self) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        inner.entries.clear();

        if !self.keep_memory {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "[MEMORY] Failed to remove memory file");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
