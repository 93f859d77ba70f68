//! Synchronizer - couples a `LocalStore` with the server through a `Remote`.
//!
//! ## Example
//!
//! ```ignore
//! use luvhive_state::{FailurePolicy, MutationMode, Synchronizer};
//!
//! let mut feed = Synchronizer::new(PostsApi::new(session))
//!     .with_mode(MutationMode::Optimistic)
//!     .with_failure_policy(FailurePolicy::MarkFailed);
//!
//! feed.create(Post::new(new_record_id(), "hello"))?;
//! feed.refresh()?;
//! feed.persist(&shadow, "alice")?;
//! ```

mod synchronizer;

use std::fmt;

use crate::record::Record;
use crate::shadow::ShadowError;
use crate::store::StoreError;

pub use synchronizer::Synchronizer;

/// Server side of a collection.
///
/// Transports implement this over HTTP (see [`Session`](crate::Session) for
/// the headers); tests implement it in memory.
pub trait Remote<R: Record> {
    type Error: fmt::Display;

    /// Fetch the server's current collection.
    fn fetch(&mut self) -> Result<Vec<R>, Self::Error>;

    /// Create a record. `idempotency_key` is stable across retries of the same
    /// create. Returns the server's version, which may carry a different id.
    fn create(&mut self, record: &R, idempotency_key: &str) -> Result<R, Self::Error>;

    /// Update a record, returning the server's version.
    fn update(&mut self, record: &R) -> Result<R, Self::Error>;

    fn delete(&mut self, id: &str) -> Result<(), Self::Error>;
}

/// When the local collection changes relative to the remote call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MutationMode {
    /// Apply locally first, then call the remote.
    #[default]
    Optimistic,
    /// Call the remote first, apply the server's result only on success.
    Pessimistic,
}

/// What happens to an optimistic change the server rejected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Put the collection back the way it was before the change.
    Rollback,
    /// Keep the change, mark the record `Failed` and remember it for `retry`.
    #[default]
    MarkFailed,
}

/// Remote operation remembered for a `Failed` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Error type for synchronizer operations.
#[derive(Debug)]
pub enum SyncError<E> {
    /// The remote call failed.
    Remote(E),
    Store(StoreError),
    Shadow(ShadowError),
    /// The result belonged to a scope that was invalidated and was dropped.
    Cancelled,
    NotFound { id: String },
    /// An edit tried to change the record's id.
    IdChanged { id: String, new_id: String },
    /// `retry` was called for a record with no failed operation.
    NothingToRetry { id: String },
}

impl<E: fmt::Display> fmt::Display for SyncError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Remote(err) => write!(f, "remote error: {}", err),
            SyncError::Store(err) => write!(f, "store error: {}", err),
            SyncError::Shadow(err) => write!(f, "shadow error: {}", err),
            SyncError::Cancelled => write!(f, "result dropped, scope was invalidated"),
            SyncError::NotFound { id } => write!(f, "record not found: {}", id),
            SyncError::IdChanged { id, new_id } => {
                write!(f, "edit of {} would change its id to {}", id, new_id)
            }
            SyncError::NothingToRetry { id } => {
                write!(f, "no failed operation to retry for {}", id)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SyncError<E> {}

impl<E> From<StoreError> for SyncError<E> {
    fn from(err: StoreError) -> Self {
        SyncError::Store(err)
    }
}

impl<E> From<ShadowError> for SyncError<E> {
    fn from(err: ShadowError) -> Self {
        SyncError::Shadow(err)
    }
}
