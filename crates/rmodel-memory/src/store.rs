// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! In-process memory store

use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::{Memory, MemoryError, MemoryKey, MemoryResult, MemoryValue};

/// Hash map behind a read/write lock; contents die with the store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<AHashMap<MemoryKey, MemoryValue>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn ensure_open(&self) -> MemoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MemoryError::Closed);
        }
        Ok(())
    }
}

impl Memory for InMemoryStore {
    fn set(&self, key: MemoryKey, value: MemoryValue) -> MemoryResult<()> {
        self.ensure_open()?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &MemoryKey) -> MemoryResult<Option<MemoryValue>> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn exists(&self, key: &MemoryKey) -> MemoryResult<bool> {
        self.ensure_open()?;
        Ok(self.entries.read().contains_key(key))
    }

    fn delete(&self, key: &MemoryKey) -> MemoryResult<bool> {
        self.ensure_open()?;
        Ok(self.entries.write().remove(key).is_some())
    }

    fn clear(&self) -> MemoryResult<()> {
        self.ensure_open()?;
        self.entries.write().clear();
        Ok(())
    }

    fn close(&self) -> MemoryResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.write().clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = InMemoryStore::new();
        store.set("a".into(), 1i64.into()).unwrap();
        store.set("a".into(), "one".into()).unwrap();

        assert_eq!(store.get(&"a".into()).unwrap(), Some(MemoryValue::from("one")));
        assert_eq!(store.len(), 1);
        assert!(store.delete(&"a".into()).unwrap());
        assert!(!store.delete(&"a".into()).unwrap());
        assert_eq!(store.get(&"a".into()).unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let store = InMemoryStore::new();
        store.set(1u8.into(), true.into()).unwrap();
        store.set(2u8.into(), false.into()).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_closed_store_rejects_calls() {
        let store = InMemoryStore::new();
        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get(&"a".into()), Err(MemoryError::Closed)));
        assert!(matches!(store.set("a".into(), 1i64.into()), Err(MemoryError::Closed)));
    }
}
