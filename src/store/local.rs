use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use crate::reconcile::merge_with;
use crate::record::{Record, SyncStatus, Tracked};

use super::{events, StoreError};

/// Copy of a whole collection, taken before an optimistic change so it can
/// be put back if the server rejects it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<R> {
    records: Vec<Tracked<R>>,
}

impl<R> StoreSnapshot<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Outcome of reconciling the store with a server response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ids already held locally that the server returned (now `Confirmed`).
    pub confirmed: Vec<String>,
    /// Ids the server returned that were not held locally.
    pub inserted: Vec<String>,
    /// Ids still `Pending` after the merge.
    pub untouched_pending: Vec<String>,
}

/// Ordered, id-unique collection of tracked records, newest first.
pub struct LocalStore<R> {
    records: Vec<Tracked<R>>,
    #[cfg(feature = "emitter")]
    emitter: EventEmitter,
}

impl<R: fmt::Debug> fmt::Debug for LocalStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("records", &self.records)
            .finish()
    }
}

impl<R: Record> Default for LocalStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> LocalStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            #[cfg(feature = "emitter")]
            emitter: EventEmitter::new(),
        }
    }

    /// Create a store from previously persisted records.
    pub fn from_tracked(records: Vec<Tracked<R>>) -> Self {
        let mut store = Self::new();
        store.records = dedup_first(records);
        store
    }

    /// Insert a record at the head of the collection as `Pending`.
    pub fn append(&mut self, record: R) -> Result<(), StoreError> {
        self.insert_head(Tracked::pending(record))
    }

    /// Insert a server-issued record at the head of the collection as `Confirmed`.
    pub fn append_confirmed(&mut self, record: R) -> Result<(), StoreError> {
        self.insert_head(Tracked::confirmed(record))
    }

    fn insert_head(&mut self, tracked: Tracked<R>) -> Result<(), StoreError> {
        if self.contains(tracked.id()) {
            return Err(StoreError::DuplicateId {
                collection: R::COLLECTION.to_string(),
                id: tracked.id().to_string(),
            });
        }

        let id = tracked.id().to_string();
        self.records.insert(0, tracked);
        self.notify(events::APPENDED, &id);
        Ok(())
    }

    /// Replace the record with `id` by `update_fn(record)`. The record becomes
    /// `Pending`. Returns false if no record has that id, or if the update
    /// would move the record onto an id another record already holds.
    pub fn mutate<F>(&mut self, id: &str, update_fn: F) -> bool
    where
        F: FnOnce(&R) -> R,
    {
        let Some(position) = self.position(id) else {
            return false;
        };

        let updated = update_fn(&self.records[position].data);
        if updated.id() != id && self.contains(updated.id()) {
            tracing::warn!(
                collection = R::COLLECTION,
                id,
                new_id = updated.id(),
                "mutation changed record id to one already held, ignored"
            );
            return false;
        }

        let tracked = &mut self.records[position];
        tracked.data = updated;
        tracked.status = SyncStatus::Pending;
        tracked.last_error = None;
        self.notify(events::MUTATED, id);
        true
    }

    /// In-place variant of [`mutate`](Self::mutate).
    pub fn update<F>(&mut self, id: &str, update_fn: F) -> bool
    where
        F: FnOnce(&mut R),
    {
        self.mutate(id, |record| {
            let mut record = record.clone();
            update_fn(&mut record);
            record
        })
    }

    /// Remove the record with `id`, returning it.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let position = self.position(id)?;
        let removed = self.records.remove(position);
        self.notify(events::REMOVED, id);
        Some(removed.data)
    }

    /// Overwrite the record with `id` by the server's version, `Confirmed`.
    pub fn replace(&mut self, id: &str, record: R) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        if record.id() != id && self.contains(record.id()) {
            return false;
        }
        self.records[position] = Tracked::confirmed(record);
        self.notify(events::MUTATED, id);
        true
    }

    pub fn mark_confirmed(&mut self, id: &str) -> bool {
        self.set_status(id, |tracked| tracked.confirm())
    }

    pub fn mark_failed(&mut self, id: &str, error: Option<&str>) -> bool {
        self.set_status(id, |tracked| tracked.fail(error))
    }

    fn set_status<F>(&mut self, id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Tracked<R>),
    {
        let Some(position) = self.position(id) else {
            return false;
        };
        apply(&mut self.records[position]);
        self.notify(events::STATUS_CHANGED, id);
        true
    }

    /// Merge a server response into the collection by id.
    ///
    /// Every returned id takes the server's data and becomes `Confirmed`.
    /// Ids the server did not return keep their local data and status.
    pub fn reconcile(&mut self, incoming: Vec<R>) -> ReconcileReport {
        let held: HashSet<String> = self.records.iter().map(|t| t.id().to_string()).collect();

        let mut report = ReconcileReport::default();
        let mut seen = HashSet::new();
        for record in &incoming {
            let id = record.id().to_string();
            if !seen.insert(id.clone()) {
                continue;
            }
            if held.contains(&id) {
                report.confirmed.push(id);
            } else {
                report.inserted.push(id);
            }
        }

        let existing = std::mem::take(&mut self.records);
        self.records = merge_with(
            existing,
            incoming.into_iter().map(Tracked::confirmed),
            |tracked| tracked.id().to_string(),
            |_, server| server,
        );

        report.untouched_pending = self.pending_ids();
        tracing::debug!(
            collection = R::COLLECTION,
            confirmed = report.confirmed.len(),
            inserted = report.inserted.len(),
            pending = report.untouched_pending.len(),
            "reconciled collection"
        );
        self.notify(events::RECONCILED, R::COLLECTION);
        report
    }

    /// Capture the whole collection for a later [`restore`](Self::restore).
    pub fn snapshot(&self) -> StoreSnapshot<R> {
        StoreSnapshot {
            records: self.records.clone(),
        }
    }

    /// Put back a collection captured by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, snapshot: StoreSnapshot<R>) {
        self.records = snapshot.records;
        self.notify(events::RESTORED, R::COLLECTION);
    }

    /// Replace the whole collection, e.g. from the persistence shadow.
    /// Later duplicates of an id are dropped.
    pub fn load(&mut self, records: Vec<Tracked<R>>) {
        self.records = dedup_first(records);
        self.notify(events::LOADED, R::COLLECTION);
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.get_tracked(id).map(|tracked| &tracked.data)
    }

    pub fn get_tracked(&self, id: &str) -> Option<&Tracked<R>> {
        self.records.iter().find(|tracked| tracked.id() == id)
    }

    pub fn status(&self, id: &str) -> Option<SyncStatus> {
        self.get_tracked(id).map(|tracked| tracked.status)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Records in display order (newest first).
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.records.iter().map(|tracked| &tracked.data)
    }

    pub fn to_vec(&self) -> Vec<R> {
        self.records().cloned().collect()
    }

    pub fn tracked(&self) -> &[Tracked<R>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.ids_with(SyncStatus::Pending)
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.ids_with(SyncStatus::Failed)
    }

    fn ids_with(&self, status: SyncStatus) -> Vec<String> {
        self.records
            .iter()
            .filter(|tracked| tracked.status == status)
            .map(|tracked| tracked.id().to_string())
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|tracked| tracked.id() == id)
    }

    /// Register a listener for a change notification (see [`events`](super::events)).
    #[cfg(feature = "emitter")]
    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener);
    }

    #[cfg(feature = "emitter")]
    fn notify(&mut self, event: &str, payload: &str) {
        self.emitter.emit(event, payload.to_string());
    }

    #[cfg(not(feature = "emitter"))]
    fn notify(&mut self, _event: &str, _payload: &str) {}
}

fn dedup_first<R: Record>(records: Vec<Tracked<R>>) -> Vec<Tracked<R>> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|tracked| seen.insert(tracked.id().to_string()))
        .collect()
}
