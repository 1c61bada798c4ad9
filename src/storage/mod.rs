// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local durable key-value storage.
//!
//! Every value is wrapped in a [`StoredEntry`] envelope carrying its expiry
//! and a content checksum. Reads never fail: expired, corrupt, or
//! tampered entries are treated as absent and dropped.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Storage keys as constants.
pub mod keys {
    pub const WIZARD_SESSION: &str = "ticket-wizard-session";
    pub const AUTH_SESSION: &str = "auth-session";
}

/// Storage errors (write path only).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid expiry: {0}")]
    InvalidTtl(String),
}

/// Synchronous key-value port, modelled on browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a live value. Expired or unreadable entries return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, optionally expiring after `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// On-disk / in-memory envelope around a stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub checksum: String,
}

/// Why an entry could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRejection {
    Expired,
    ChecksumMismatch,
}

impl StoredEntry {
    /// Wrap a value, computing its expiry relative to `now`.
    pub fn seal(
        value: &str,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let expires_at = chrono::Duration::from_std(ttl)
                    .ok()
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| StorageError::InvalidTtl(format!("{:?} from {}", ttl, now)))?;
                Some(expires_at)
            }
            None => None,
        };

        Ok(Self {
            value: value.to_string(),
            expires_at,
            checksum: checksum(value),
        })
    }

    /// Unwrap the value if it is intact and unexpired at `now`.
    pub fn open(&self, now: DateTime<Utc>) -> Result<&str, EntryRejection> {
        if self.checksum != checksum(&self.value) {
            return Err(EntryRejection::ChecksumMismatch);
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(EntryRejection::Expired),
            _ => Ok(&self.value),
        }
    }
}

fn checksum(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Read and deserialize a JSON value. Undecodable values are removed.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Dropping undecodable stored value");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove undecodable value");
            }
            None
        }
    }
}

/// Serialize and write a JSON value.
pub fn set_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_expires() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entry = StoredEntry::seal("hello", Some(Duration::from_secs(60)), now).unwrap();

        assert_eq!(entry.open(now + chrono::Duration::seconds(59)), Ok("hello"));
        assert_eq!(
            entry.open(now + chrono::Duration::seconds(60)),
            Err(EntryRejection::Expired)
        );
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entry = StoredEntry::seal("hello", None, now).unwrap();
        assert_eq!(entry.open(now + chrono::Duration::days(3650)), Ok("hello"));
    }

    #[test]
    fn test_entry_detects_tampering() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut entry = StoredEntry::seal("hello", None, now).unwrap();
        entry.value = "goodbye".to_string();
        assert_eq!(entry.open(now), Err(EntryRejection::ChecksumMismatch));
    }

    #[test]
    fn test_entry_rejects_unrepresentable_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ttl = Duration::from_secs(10_000_000_000 * 60 * 60);
        assert!(matches!(
            StoredEntry::seal("hello", Some(ttl), now),
            Err(StorageError::InvalidTtl(_))
        ));
    }
}
