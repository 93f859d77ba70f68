use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::record::Record;
use crate::shadow::{KeyValueBackend, PersistenceShadow, WriteOutcome};
use crate::store::{LocalStore, ReconcileReport, StoreError, StoreSnapshot};

use super::{FailurePolicy, MutationMode, Operation, Remote, SyncError};

/// A local collection kept in step with its server counterpart.
///
/// Mutations go through the configured [`MutationMode`]; remote failures
/// are handled per [`FailurePolicy`]. Fetch results are tied to a scope so
/// that results arriving after [`invalidate`](Self::invalidate) are dropped.
pub struct Synchronizer<R, P> {
    store: LocalStore<R>,
    remote: P,
    mode: MutationMode,
    on_failure: FailurePolicy,
    scope: CancellationToken,
    failed_ops: HashMap<String, Operation>,
}

impl<R: Record, P: Remote<R>> Synchronizer<R, P> {
    pub fn new(remote: P) -> Self {
        Self {
            store: LocalStore::new(),
            remote,
            mode: MutationMode::default(),
            on_failure: FailurePolicy::default(),
            scope: CancellationToken::new(),
            failed_ops: HashMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: MutationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Start from an existing store (e.g. one restored from the shadow).
    pub fn with_store(mut self, store: LocalStore<R>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &LocalStore<R> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore<R> {
        &mut self.store
    }

    pub fn remote(&self) -> &P {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut P {
        &mut self.remote
    }

    pub fn mode(&self) -> MutationMode {
        self.mode
    }

    /// The remembered operation of a `Failed` record.
    pub fn failed_operation(&self, id: &str) -> Option<Operation> {
        self.failed_ops.get(id).copied()
    }

    /// Create a record. Returns the id it ends up under, which is the
    /// server's id if the server assigned a different one.
    pub fn create(&mut self, record: R) -> Result<String, SyncError<P::Error>> {
        let id = record.id().to_string();

        match self.mode {
            MutationMode::Optimistic => {
                let snapshot = self.store.snapshot();
                self.store.append(record.clone())?;
                match self.remote.create(&record, &id) {
                    Ok(server) => Ok(self.accept(&id, server)),
                    Err(err) => Err(self.reject(snapshot, &id, Operation::Create, err)),
                }
            }
            MutationMode::Pessimistic => {
                if self.store.contains(&id) {
                    return Err(StoreError::DuplicateId {
                        collection: R::COLLECTION.to_string(),
                        id,
                    }
                    .into());
                }
                let server = self.remote.create(&record, &id).map_err(SyncError::Remote)?;
                let final_id = server.id().to_string();
                self.store.append_confirmed(server)?;
                Ok(final_id)
            }
        }
    }

    /// Apply `update_fn` to the record with `id` and send it to the server.
    ///
    /// A record whose create never reached the server is sent as a create,
    /// so a later `retry` still publishes it. `update_fn` must not change
    /// the record's id.
    pub fn edit<F>(&mut self, id: &str, update_fn: F) -> Result<(), SyncError<P::Error>>
    where
        F: FnOnce(&mut R),
    {
        let Some(mut draft) = self.store.get(id).cloned() else {
            return Err(SyncError::NotFound { id: id.to_string() });
        };
        update_fn(&mut draft);
        if draft.id() != id {
            return Err(SyncError::IdChanged {
                id: id.to_string(),
                new_id: draft.id().to_string(),
            });
        }

        let operation = if self.is_unsent(id) {
            Operation::Create
        } else {
            Operation::Update
        };

        match self.mode {
            MutationMode::Optimistic => {
                let snapshot = self.store.snapshot();
                if !self.store.mutate(id, |_| draft.clone()) {
                    return Err(SyncError::NotFound { id: id.to_string() });
                }
                match self.send(operation, &draft) {
                    Ok(server) => {
                        self.accept(id, server);
                        Ok(())
                    }
                    Err(err) => Err(self.reject(snapshot, id, operation, err)),
                }
            }
            MutationMode::Pessimistic => {
                let server = self.send(operation, &draft).map_err(SyncError::Remote)?;
                self.accept(id, server);
                Ok(())
            }
        }
    }

    /// Delete the record with `id` locally and on the server.
    ///
    /// A record whose create never reached the server is only dropped
    /// locally.
    pub fn delete(&mut self, id: &str) -> Result<Option<R>, SyncError<P::Error>> {
        if !self.store.contains(id) {
            return Err(SyncError::NotFound { id: id.to_string() });
        }

        if self.is_unsent(id) {
            self.failed_ops.remove(id);
            tracing::debug!(
                collection = R::COLLECTION,
                id,
                "discarding record the server never received"
            );
            return Ok(self.store.remove(id));
        }

        match self.mode {
            MutationMode::Optimistic => {
                let snapshot = self.store.snapshot();
                let removed = self.store.remove(id);
                match self.remote.delete(id) {
                    Ok(()) => {
                        self.failed_ops.remove(id);
                        Ok(removed)
                    }
                    Err(err) => Err(self.reject(snapshot, id, Operation::Delete, err)),
                }
            }
            MutationMode::Pessimistic => {
                self.remote.delete(id).map_err(SyncError::Remote)?;
                self.failed_ops.remove(id);
                Ok(self.store.remove(id))
            }
        }
    }

    /// Re-send the failed operation of a `Failed` record.
    pub fn retry(&mut self, id: &str) -> Result<(), SyncError<P::Error>> {
        let Some(operation) = self.failed_ops.get(id).copied() else {
            return Err(SyncError::NothingToRetry { id: id.to_string() });
        };
        let Some(record) = self.store.get(id).cloned() else {
            self.failed_ops.remove(id);
            return Err(SyncError::NotFound { id: id.to_string() });
        };

        let result = match operation {
            Operation::Delete => self.remote.delete(id).map(|()| None),
            _ => self.send(operation, &record).map(Some),
        };

        match result {
            Ok(Some(server)) => {
                self.accept(id, server);
                Ok(())
            }
            Ok(None) => {
                self.failed_ops.remove(id);
                self.store.remove(id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(collection = R::COLLECTION, id, error = %err, "retry failed");
                self.store.mark_failed(id, Some(&err.to_string()));
                Err(SyncError::Remote(err))
            }
        }
    }

    /// Fetch the server's collection and reconcile it into the store.
    pub fn refresh(&mut self) -> Result<ReconcileReport, SyncError<P::Error>> {
        let token = self.scope();
        let incoming = self.remote.fetch().map_err(SyncError::Remote)?;
        self.apply_fetched(&token, incoming)
    }

    /// Token for a request issued now. It is cancelled by the next
    /// [`invalidate`](Self::invalidate).
    pub fn scope(&self) -> CancellationToken {
        self.scope.child_token()
    }

    /// Drop interest in every request issued so far.
    pub fn invalidate(&mut self) {
        self.scope.cancel();
        self.scope = CancellationToken::new();
    }

    /// Reconcile a fetch result, unless its scope was invalidated meanwhile.
    pub fn apply_fetched(
        &mut self,
        token: &CancellationToken,
        incoming: Vec<R>,
    ) -> Result<ReconcileReport, SyncError<P::Error>> {
        if token.is_cancelled() {
            tracing::debug!(
                collection = R::COLLECTION,
                records = incoming.len(),
                "dropping fetch result from invalidated scope"
            );
            return Err(SyncError::Cancelled);
        }

        let report = self.store.reconcile(incoming);
        let store = &self.store;
        self.failed_ops
            .retain(|id, _| store.get_tracked(id).is_some_and(|t| t.is_failed()));
        Ok(report)
    }

    /// Mirror the store into the shadow under `username`.
    pub fn persist<B: KeyValueBackend>(
        &self,
        shadow: &PersistenceShadow<B>,
        username: &str,
    ) -> Result<WriteOutcome, SyncError<P::Error>> {
        Ok(shadow.write_records(username, self.store.tracked())?)
    }

    /// Replace the store with what the shadow holds for `username`.
    /// Returns the number of records loaded.
    pub fn restore<B: KeyValueBackend>(
        &mut self,
        shadow: &PersistenceShadow<B>,
        username: &str,
    ) -> usize {
        self.store.load(shadow.read_records(username));
        // the failed operation is not persisted; such records wait for the next refresh
        self.failed_ops.clear();
        tracing::debug!(
            collection = R::COLLECTION,
            records = self.store.len(),
            failed = self.store.failed_ids().len(),
            "restored collection from shadow"
        );
        self.store.len()
    }

    /// Whether the record's create is still waiting for a successful retry.
    fn is_unsent(&self, id: &str) -> bool {
        self.failed_ops.get(id) == Some(&Operation::Create)
    }

    /// Send a create or update of `record`.
    fn send(&mut self, operation: Operation, record: &R) -> Result<R, P::Error> {
        match operation {
            Operation::Create => self.remote.create(record, record.id()),
            _ => self.remote.update(record),
        }
    }

    /// Put the server's version of a record in place of the local one.
    fn accept(&mut self, id: &str, server: R) -> String {
        self.failed_ops.remove(id);
        let final_id = server.id().to_string();
        if !self.store.replace(id, server.clone()) {
            self.store.remove(id);
            self.store.reconcile(vec![server]);
        }
        final_id
    }

    fn reject(
        &mut self,
        snapshot: StoreSnapshot<R>,
        id: &str,
        operation: Operation,
        err: P::Error,
    ) -> SyncError<P::Error> {
        let message = err.to_string();
        tracing::warn!(
            collection = R::COLLECTION,
            id,
            ?operation,
            error = %message,
            "remote mutation failed"
        );

        match self.on_failure {
            FailurePolicy::Rollback => self.store.restore(snapshot),
            FailurePolicy::MarkFailed => {
                if !self.store.contains(id) {
                    self.store.restore(snapshot);
                }
                self.store.mark_failed(id, Some(&message));
                self.failed_ops.insert(id.to_string(), operation);
            }
        }

        SyncError::Remote(err)
    }
}
