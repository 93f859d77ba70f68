//! Records - Identified domain entities held by a `LocalStore`.
//!
//! A record is any feed entity with exactly one identifier: a post, a story,
//! a comment, a follow edge. Two records with the same id are the same
//! logical entity at different points in time.
//!
//! ## Example
//!
//! ```ignore
//! use luvhive_state::{Record, Tracked, SyncStatus};
//!
//! #[derive(Serialize, Deserialize, Clone, Record)]
//! #[record(collection = "posts")]
//! struct Post {
//!     #[record(id)]
//!     pub id: String,
//!     pub content: String,
//! }
//!
//! let tracked = Tracked::pending(post);
//! assert_eq!(tracked.status, SyncStatus::Pending);
//! ```

mod id;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use id::new_record_id;

/// Trait for types that can be held in a `LocalStore` and mirrored by the shadow.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The collection type for this record (e.g., "posts", "stories").
    /// Becomes the middle segment of the shadow key `{prefix}_{collection}_{username}`.
    const COLLECTION: &'static str;

    /// Returns the identifier of this record.
    fn id(&self) -> &str;
}

/// Where a record stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Applied locally, not yet seen in a server response.
    Pending,
    /// Seen in a server response (or written through the pessimistic path).
    Confirmed,
    /// The accompanying remote call failed; the local change was kept.
    Failed,
}

/// A record together with its sync status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked<T> {
    pub data: T,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl<T> Tracked<T> {
    pub fn pending(data: T) -> Self {
        Self {
            data,
            status: SyncStatus::Pending,
            last_error: None,
        }
    }

    pub fn confirmed(data: T) -> Self {
        Self {
            data,
            status: SyncStatus::Confirmed,
            last_error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SyncStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == SyncStatus::Confirmed
    }

    pub fn is_failed(&self) -> bool {
        self.status == SyncStatus::Failed
    }

    pub(crate) fn confirm(&mut self) {
        self.status = SyncStatus::Confirmed;
        self.last_error = None;
    }

    pub(crate) fn fail(&mut self, error: Option<&str>) {
        self.status = SyncStatus::Failed;
        self.last_error = error.map(|value| value.to_string());
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Record> Tracked<T> {
    pub fn id(&self) -> &str {
        self.data.id()
    }
}
