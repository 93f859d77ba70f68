use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::BackendError;

/// String-keyed durable store the shadow writes through.
///
/// `set` is all-or-nothing: on error the key keeps its previous value.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove a key. Returns true if it existed.
    fn remove(&self, key: &str) -> Result<bool, BackendError>;

    fn keys(&self) -> Result<Vec<String>, BackendError>;
}

/// Bytes an entry counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Size of `entries` after `key` is set to `value`.
pub(crate) fn size_after_set(entries: &BTreeMap<String, String>, key: &str, value: &str) -> usize {
    let used: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
    let replaced = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
    used - replaced + entry_size(key, value)
}

/// In-memory backend with an optional byte quota.
///
/// Clone-friendly (cloning shares the same underlying storage).
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes taking it over `quota` bytes (keys + values).
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            quota: Some(quota),
        }
    }

    /// Bytes currently stored.
    pub fn used_bytes(&self) -> Result<usize, BackendError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BackendError::LockPoisoned("read"))?;
        Ok(entries.iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BackendError::LockPoisoned("read"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        if let Some(quota) = self.quota {
            let needed = size_after_set(&entries, key, value);
            if needed > quota {
                return Err(BackendError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BackendError::LockPoisoned("read"))?;
        Ok(entries.keys().cloned().collect())
    }
}
