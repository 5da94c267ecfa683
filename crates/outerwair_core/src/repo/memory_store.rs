//! In-process durable store.
//!
//! Used by hosts without a file system and by tests. An optional byte
//! capacity models browser-style storage quotas.

use super::{DurableStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Map-backed store with an optional total capacity in bytes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose keys plus values may not exceed `capacity_bytes`.
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    /// Total bytes currently held (keys plus values).
    pub fn used_bytes(&self) -> usize {
        self.lock()
            .map(|entries| total_bytes(&entries))
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        if let Some(capacity) = self.capacity_bytes {
            let replaced = entries
                .get(key)
                .map_or(0, |existing| key.len() + existing.len());
            let projected = total_bytes(&entries) - replaced + key.len() + value.len();
            if projected > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

fn total_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries
        .iter()
        .map(|(key, value)| key.len() + value.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::repo::{DurableStore, StorageError};

    #[test]
    fn save_load_remove_roundtrip() {
        let store = MemoryStore::new();
        store.save("k", "v1").expect("save");
        store.save("k", "v2").expect("overwrite");
        assert_eq!(store.load("k").expect("load").as_deref(), Some("v2"));

        store.remove("k").expect("remove");
        store.remove("k").expect("remove is idempotent");
        assert_eq!(store.load("k").expect("load"), None);
    }

    #[test]
    fn capacity_rejects_oversized_writes_and_keeps_previous_value() {
        let store = MemoryStore::with_capacity(10);
        store.save("key", "1234").expect("fits");

        let err = store.save("key", "123456789").expect_err("exceeds capacity");
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                key: "key".to_string()
            }
        );
        assert!(err.is_quota_exceeded());
        assert_eq!(store.load("key").expect("load").as_deref(), Some("1234"));
        assert_eq!(store.used_bytes(), 7);
    }

    #[test]
    fn overwrite_accounts_for_replaced_value() {
        let store = MemoryStore::with_capacity(8);
        store.save("ab", "123456").expect("exactly fits");
        store.save("ab", "654321").expect("replacement fits too");
    }
}
