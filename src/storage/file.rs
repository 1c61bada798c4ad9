// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed store: one JSON envelope per key under a directory.
//!
//! Writes go through a temporary file and a rename. There is no locking;
//! two processes writing the same key race and the last rename wins.

use super::{KeyValueStore, StorageError, StoredEntry};
use crate::time_utils::Clock;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Durable key-value store rooted at a directory.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    /// Open (and create if needed) a store directory.
    pub fn open(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir, clock })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    fn read_entry(&self, path: &Path) -> Option<StoredEntry> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read stored entry");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Dropping corrupt stored entry");
                let _ = fs::remove_file(path);
                None
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        let entry = self.read_entry(&path)?;

        match entry.open(self.clock.now()) {
            Ok(value) => Some(value.to_string()),
            Err(reason) => {
                tracing::debug!(key, ?reason, "Dropping stale stored entry");
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
        let entry = StoredEntry::seal(value, ttl, self.clock.now())?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::SystemClock;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), Arc::new(SystemClock)).unwrap();
        (dir, store)
    }

    #[test]
    fn test_file_store_roundtrip() {
        let (_dir, store) = store();
        store.set("auth-session", "{\"a\":1}", None).unwrap();
        assert_eq!(store.get("auth-session").as_deref(), Some("{\"a\":1}"));

        store.remove("auth-session").unwrap();
        assert_eq!(store.get("auth-session"), None);
        // Removing twice is fine
        store.remove("auth-session").unwrap();
    }

    #[test]
    fn test_file_store_drops_corrupt_file() {
        let (_dir, store) = store();
        let path = store.path_for("ticket-wizard-session");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(store.get("ticket-wizard-session"), None);
        assert!(!path.exists(), "corrupt file should be removed");
    }

    #[test]
    fn test_key_sanitization() {
        let (_dir, store) = store();
        let path = store.path_for("../escape/me");
        assert_eq!(path.parent().unwrap(), store.dir());
        assert!(path.ends_with("___escape_me.json"));
    }
}
