use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ShadowError;

/// Layout and limits of the persistence shadow.
///
/// Loadable from JSON; any field left out takes its default:
///
/// ```json
/// { "prefix": "luvhive", "caps": { "posts": 50, "stories": 20 }, "eviction_retain": 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Namespace of every key the shadow owns.
    pub prefix: String,
    /// Collection types eviction and cleanup recognise.
    pub collections: Vec<String>,
    /// Maximum entries kept per collection type; the tail is dropped on write.
    pub caps: BTreeMap<String, usize>,
    /// Entries kept per collection when storage runs out.
    pub eviction_retain: usize,
    /// Suffix of the key holding the active user's profile.
    pub session_suffix: String,
    /// Extra full keys exempt from eviction and corruption removal.
    pub protected_keys: Vec<String>,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        let collections = ["posts", "stories", "saved", "followers", "following", "settings"];
        Self {
            prefix: "luvhive".to_string(),
            collections: collections.iter().map(|c| c.to_string()).collect(),
            caps: [("posts".to_string(), 50), ("stories".to_string(), 20)]
                .into_iter()
                .collect(),
            eviction_retain: 5,
            session_suffix: "current_user".to_string(),
            protected_keys: Vec::new(),
        }
    }
}

impl ShadowConfig {
    pub fn from_json(text: &str) -> Result<Self, ShadowError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ShadowError> {
        if self.prefix.is_empty() {
            return Err(ShadowError::Config("prefix must not be empty".into()));
        }
        if self.collections.iter().any(|c| c.is_empty()) {
            return Err(ShadowError::Config("collection names must not be empty".into()));
        }
        if let Some((collection, _)) = self.caps.iter().find(|(_, cap)| **cap == 0) {
            return Err(ShadowError::Config(format!(
                "cap for {} must be at least 1",
                collection
            )));
        }
        Ok(())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Register an additional collection type.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        if !self.collections.contains(&collection) {
            self.collections.push(collection);
        }
        self
    }

    pub fn with_cap(mut self, collection: impl Into<String>, cap: usize) -> Self {
        self.caps.insert(collection.into(), cap);
        self
    }

    pub fn with_eviction_retain(mut self, retain: usize) -> Self {
        self.eviction_retain = retain;
        self
    }

    pub fn with_protected_key(mut self, key: impl Into<String>) -> Self {
        self.protected_keys.push(key.into());
        self
    }

    pub fn cap_for(&self, collection: &str) -> Option<usize> {
        self.caps.get(collection).copied()
    }

    /// `{prefix}_{collection}_{username}`
    pub fn key(&self, collection: &str, username: &str) -> String {
        format!("{}_{}_{}", self.prefix, collection, username)
    }

    /// `{prefix}_{session_suffix}`
    pub fn session_key(&self) -> String {
        format!("{}_{}", self.prefix, self.session_suffix)
    }

    pub fn is_protected(&self, key: &str) -> bool {
        key == self.session_key() || self.protected_keys.iter().any(|k| k == key)
    }

    pub fn owns(&self, key: &str) -> bool {
        key.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('_'))
    }

    /// The known collection type a key belongs to.
    ///
    /// Longest match wins, so `following` is not mistaken for a
    /// hypothetical `follow` collection.
    pub fn collection_of(&self, key: &str) -> Option<&str> {
        let rest = key.strip_prefix(&self.prefix)?.strip_prefix('_')?;
        self.collections
            .iter()
            .filter(|collection| {
                rest.strip_prefix(collection.as_str())
                    .is_some_and(|tail| tail.len() > 1 && tail.starts_with('_'))
            })
            .max_by_key(|collection| collection.len())
            .map(|collection| collection.as_str())
    }
}
