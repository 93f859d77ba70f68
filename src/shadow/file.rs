use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::backend::{size_after_set, KeyValueBackend};
use super::BackendError;

/// Backend persisting all keys as one JSON object in a file.
///
/// Every write replaces the file through a sibling temp file and a rename,
/// so a crash mid-write leaves the previous document in place. Writers in
/// other processes are not coordinated; the last rename wins.
#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    quota: Option<usize>,
    guard: Arc<Mutex<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: None,
            guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling written before the rename: the full file name plus `.tmp`,
    /// so it never coincides with the live file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, BackendError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| BackendError::Corrupt(e.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let text =
            serde_json::to_string(entries).map_err(|e| BackendError::Corrupt(e.to_string()))?;
        let tmp = self.temp_path();
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| BackendError::LockPoisoned("file read"))?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| BackendError::LockPoisoned("file write"))?;
        let mut entries = self.load()?;

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
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool, BackendError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| BackendError::LockPoisoned("file write"))?;
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| BackendError::LockPoisoned("file read"))?;
        Ok(self.load()?.into_keys().collect())
    }
}
