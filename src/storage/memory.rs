// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store. Used for temporary (non-remembered) sessions and tests.

use super::{KeyValueStore, StorageError, StoredEntry};
use crate::time_utils::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Process-lifetime key-value store.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Raw envelope access, bypassing expiry (for inspection in tests).
    pub fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.entries.get(key).map(|e| e.clone())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let opened = {
            let entry = self.entries.get(key)?;
            entry.open(now).map(str::to_string)
        };

        match opened {
            Ok(value) => Some(value),
            Err(reason) => {
                tracing::debug!(key, ?reason, "Dropping stale in-memory entry");
                self.entries.remove(key);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
        let entry = StoredEntry::seal(value, ttl, self.clock.now())?;
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}
