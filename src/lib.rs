// Lets `#[derive(Record)]` resolve `luvhive_state::Record` inside this crate too.
extern crate self as luvhive_state;

mod reaction;
mod reconcile;
mod record;
mod session;
mod shadow;
mod store;
mod sync;

pub use reaction::{Reactable, Reaction, Reactions};
pub use reconcile::merge_by_id;
pub use record::{new_record_id, Record, SyncStatus, Tracked};
pub use session::{Session, SessionError, DEV_USER_HEADER, IDEMPOTENCY_HEADER, INIT_DATA_HEADER};
pub use shadow::{
    BackendError, CleanupReport, EvictionReport, FileBackend, KeyValueBackend, MemoryBackend,
    PersistenceShadow, ShadowConfig, ShadowError, WriteOutcome,
};
pub use store::{events, LocalStore, ReconcileReport, StoreError, StoreSnapshot};
pub use sync::{FailurePolicy, MutationMode, Operation, Remote, SyncError, Synchronizer};

// Derive macro for Record (same name as the trait, like serde's Serialize)
pub use luvhive_state_macros::Record;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;

// Re-export the token type handed out by `Synchronizer::scope`
pub use tokio_util::sync::CancellationToken;
