//! Persistence Shadow - best-effort mirror of per-user collections.
//!
//! Collections are stored as JSON arrays under `{prefix}_{collection}_{username}`
//! in a string key-value backend, newest first. The shadow is the fallback
//! source of truth after a reload; it never refuses to read, and it
//! recovers from storage exhaustion by trimming old data and retrying once.
//!
//! ## Example
//!
//! ```ignore
//! use luvhive_state::{MemoryBackend, PersistenceShadow, ShadowConfig};
//!
//! let shadow = PersistenceShadow::new(MemoryBackend::with_quota(64 * 1024), ShadowConfig::default());
//! shadow.write("posts", "alice", &posts)?;
//! let posts: Vec<Post> = shadow.read("posts", "alice");
//! ```

mod backend;
mod config;
mod file;
mod persistence;

use std::fmt;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use config::ShadowConfig;
pub use file::FileBackend;
pub use persistence::{CleanupReport, EvictionReport, PersistenceShadow, WriteOutcome};

/// Error type for key-value backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The write would take the backend over its byte quota. Nothing was written.
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    /// A lock guarding the backend was poisoned.
    LockPoisoned(&'static str),
    /// Filesystem error.
    Io(String),
    /// The backing document could not be encoded or decoded.
    Corrupt(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::QuotaExceeded { key, needed, quota } => write!(
                f,
                "quota exceeded writing {} ({} bytes needed, quota {})",
                key, needed, quota
            ),
            BackendError::LockPoisoned(operation) => {
                write!(f, "backend lock poisoned during {}", operation)
            }
            BackendError::Io(msg) => write!(f, "backend io error: {}", msg),
            BackendError::Corrupt(msg) => write!(f, "backend document corrupt: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// Error type for persistence shadow operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowError {
    /// The write still did not fit after evicting old data and retrying.
    /// The key keeps its previous value.
    QuotaExceeded { key: String },
    /// Serialization error.
    Serde(String),
    /// Invalid configuration.
    Config(String),
    /// Any other backend failure.
    Backend(BackendError),
}

impl fmt::Display for ShadowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShadowError::QuotaExceeded { key } => write!(
                f,
                "failed to save {}: storage is full even after clearing old data, try a smaller image",
                key
            ),
            ShadowError::Serde(msg) => write!(f, "shadow serialization error: {}", msg),
            ShadowError::Config(msg) => write!(f, "shadow configuration error: {}", msg),
            ShadowError::Backend(err) => write!(f, "shadow backend error: {}", err),
        }
    }
}

impl std::error::Error for ShadowError {}

impl From<BackendError> for ShadowError {
    fn from(err: BackendError) -> Self {
        ShadowError::Backend(err)
    }
}

impl From<serde_json::Error> for ShadowError {
    fn from(err: serde_json::Error) -> Self {
        ShadowError::Serde(err.to_string())
    }
}
