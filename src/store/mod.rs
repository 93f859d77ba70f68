//! Local Mutation Store - the in-memory collection a view renders from.
//!
//! Every operation is synchronous and applied immediately, before (or
//! without) any server confirmation. Records are kept newest first and ids
//! are unique within a store.
//!
//! ## Example
//!
//! ```ignore
//! use luvhive_state::{LocalStore, new_record_id};
//!
//! let mut feed = LocalStore::<Post>::new();
//! feed.append(Post::new(new_record_id(), "hello"))?;
//! feed.update(&id, |post| post.content.push_str(" (edited)"));
//! feed.remove(&id);
//! ```

mod local;

use std::fmt;

pub use local::{LocalStore, ReconcileReport, StoreSnapshot};

/// Names of the change notifications a `LocalStore` emits.
///
/// The payload is the affected record id, or the collection name for
/// whole-collection changes (`reconciled`, `restored`, `loaded`).
pub mod events {
    pub const APPENDED: &str = "appended";
    pub const MUTATED: &str = "mutated";
    pub const REMOVED: &str = "removed";
    pub const STATUS_CHANGED: &str = "status_changed";
    pub const RECONCILED: &str = "reconciled";
    pub const RESTORED: &str = "restored";
    pub const LOADED: &str = "loaded";
}

/// Error type for local store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this id is already in the collection.
    DuplicateId { collection: String, id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateId { collection, id } => {
                write!(f, "duplicate record id in {}: {}", collection, id)
            }
        }
    }
}

impl std::error::Error for StoreError {}
