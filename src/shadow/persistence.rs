use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::record::{Record, Tracked};

use super::{BackendError, KeyValueBackend, ShadowConfig, ShadowError};

/// Result of a successful collection write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub key: String,
    /// Entries stored under the key.
    pub stored: usize,
    /// Entries dropped from the tail to respect the collection cap.
    pub truncated: usize,
    /// Whether old data had to be evicted before the write fit.
    pub evicted: bool,
}

/// Keys trimmed while recovering from storage exhaustion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub truncated_keys: Vec<String>,
    pub dropped_entries: usize,
}

/// Outcome of a corruption sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    /// Unparseable keys that were deleted.
    pub removed: Vec<String>,
    /// Unparseable protected keys left in place.
    pub preserved: Vec<String>,
}

/// Best-effort mirror of per-user collections into a key-value backend.
pub struct PersistenceShadow<B> {
    backend: B,
    config: ShadowConfig,
}

impl<B: KeyValueBackend> PersistenceShadow<B> {
    pub fn new(backend: B, config: ShadowConfig) -> Self {
        Self { backend, config }
    }

    pub fn with_defaults(backend: B) -> Self {
        Self::new(backend, ShadowConfig::default())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Store `items` (newest first) under `{prefix}_{collection}_{username}`,
    /// replacing whatever was there.
    ///
    /// Entries past the collection's cap are dropped from the tail. If the
    /// backend is full, every other known collection is trimmed to
    /// `eviction_retain` entries and the write is retried once. If the retry
    /// fails too, the key keeps its previous value and
    /// [`ShadowError::QuotaExceeded`] is returned.
    pub fn write<T: Serialize>(
        &self,
        collection: &str,
        username: &str,
        items: &[T],
    ) -> Result<WriteOutcome, ShadowError> {
        let key = self.config.key(collection, username);
        let kept = match self.config.cap_for(collection) {
            Some(cap) if items.len() > cap => &items[..cap],
            _ => items,
        };
        let value = serde_json::to_string(kept)?;

        let evicted = self.set_with_eviction(&key, &value)?;
        Ok(WriteOutcome {
            key,
            stored: kept.len(),
            truncated: items.len() - kept.len(),
            evicted,
        })
    }

    /// Set `key`; if the backend is full, evict old data (never `key`
    /// itself) and retry once. Returns whether eviction ran.
    fn set_with_eviction(&self, key: &str, value: &str) -> Result<bool, ShadowError> {
        match self.backend.set(key, value) {
            Ok(()) => return Ok(false),
            Err(BackendError::QuotaExceeded { needed, quota, .. }) => {
                tracing::warn!(key, needed, quota, "shadow storage full, evicting old data");
            }
            Err(err) => return Err(err.into()),
        }

        let report = self.evict_old_data(Some(key))?;
        tracing::info!(
            keys = report.truncated_keys.len(),
            dropped = report.dropped_entries,
            "evicted old shadow data"
        );

        match self.backend.set(key, value) {
            Ok(()) => Ok(true),
            Err(BackendError::QuotaExceeded { .. }) => {
                tracing::error!(key, "shadow write failed after eviction");
                Err(ShadowError::QuotaExceeded {
                    key: key.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load the collection stored for `username`.
    ///
    /// Absent, unreadable or malformed data reads as empty. A value that is
    /// not valid JSON is deleted unless its key is protected; valid JSON of
    /// another shape is kept.
    pub fn read<T: DeserializeOwned>(&self, collection: &str, username: &str) -> Vec<T> {
        let key = self.config.key(collection, username);
        self.read_key(&key).unwrap_or_default()
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key, error = %err, "shadow read failed");
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                self.discard_malformed(key, &err.to_string());
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::warn!(key, error = %err, "shadow value has an unexpected shape, ignoring it");
                None
            }
        }
    }

    fn discard_malformed(&self, key: &str, reason: &str) -> bool {
        if self.config.is_protected(key) {
            tracing::warn!(key, reason, "protected shadow key is malformed, leaving it in place");
            return false;
        }

        tracing::warn!(key, reason, "removing malformed shadow key");
        if let Err(err) = self.backend.remove(key) {
            tracing::warn!(key, error = %err, "failed to remove malformed shadow key");
            return false;
        }
        true
    }

    /// Store the tracked records of a store under `R::COLLECTION`.
    pub fn write_records<R: Record>(
        &self,
        username: &str,
        records: &[Tracked<R>],
    ) -> Result<WriteOutcome, ShadowError> {
        self.write(R::COLLECTION, username, records)
    }

    pub fn read_records<R: Record>(&self, username: &str) -> Vec<Tracked<R>> {
        self.read(R::COLLECTION, username)
    }

    pub fn remove(&self, collection: &str, username: &str) -> Result<bool, ShadowError> {
        let key = self.config.key(collection, username);
        Ok(self.backend.remove(&key)?)
    }

    /// Store the active user's profile under the protected session key.
    pub fn write_session<T: Serialize>(&self, profile: &T) -> Result<(), ShadowError> {
        let key = self.config.session_key();
        let value = serde_json::to_string(profile)?;
        self.set_with_eviction(&key, &value)?;
        Ok(())
    }

    /// The active user's profile; `None` if absent or malformed. A malformed
    /// session is logged and kept.
    pub fn read_session<T: DeserializeOwned>(&self) -> Option<T> {
        self.read_key(&self.config.session_key())
    }

    pub fn clear_session(&self) -> Result<bool, ShadowError> {
        Ok(self.backend.remove(&self.config.session_key())?)
    }

    /// Trim every stored collection of a known type to its newest
    /// `eviction_retain` entries. Protected keys, `skip`, values that are
    /// not arrays, and values that do not parse are left alone.
    pub fn evict_old_data(&self, skip: Option<&str>) -> Result<EvictionReport, ShadowError> {
        let retain = self.config.eviction_retain;
        let mut report = EvictionReport::default();

        for key in self.backend.keys()? {
            if Some(key.as_str()) == skip
                || self.config.is_protected(&key)
                || self.config.collection_of(&key).is_none()
            {
                continue;
            }

            let Some(raw) = self.backend.get(&key)? else {
                continue;
            };
            let Ok(Value::Array(mut entries)) = serde_json::from_str::<Value>(&raw) else {
                continue;
            };
            if entries.len() <= retain {
                continue;
            }

            let dropped = entries.len() - retain;
            entries.truncate(retain);
            self.backend.set(&key, &serde_json::to_string(&entries)?)?;

            tracing::debug!(key = %key, dropped, "truncated shadow collection");
            report.dropped_entries += dropped;
            report.truncated_keys.push(key);
        }

        Ok(report)
    }

    /// Sweep every key under the prefix and delete values that are not
    /// valid JSON. Protected keys are never deleted.
    pub fn cleanup(&self) -> Result<CleanupReport, ShadowError> {
        let mut report = CleanupReport::default();

        for key in self.backend.keys()? {
            if !self.config.owns(&key) {
                continue;
            }
            report.scanned += 1;

            let Some(raw) = self.backend.get(&key)? else {
                continue;
            };
            if let Err(err) = serde_json::from_str::<Value>(&raw) {
                if self.discard_malformed(&key, &err.to_string()) {
                    report.removed.push(key);
                } else if self.config.is_protected(&key) {
                    report.preserved.push(key);
                }
            }
        }

        Ok(report)
    }
}
