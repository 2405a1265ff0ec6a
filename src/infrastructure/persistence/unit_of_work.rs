//! Unit of work
//!
//! Collects pending mutations against one database transaction. Nothing
//! touches the store until [`UnitOfWork::save_changes`], which runs the
//! mutation interceptor over the batch and then issues one conditional write
//! per entry. [`UnitOfWork::commit`] makes the batch durable; dropping the
//! unit of work without committing rolls everything back.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sea_orm::{Condition, DatabaseConnection, DatabaseTransaction, TransactionTrait};

use super::concurrency;
use super::interceptor::MutationInterceptor;
use super::query::{self, ReadScope};
use super::registry::EntityRegistry;
use super::tracked::{TrackedModel, entity_name};
use crate::domain::{AuditContext, Auditable, Capabilities, DomainError, SoftDeletable, VersionToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    /// Delete of a soft-deletable record, already rewritten into an update
    SoftDeleted,
    Deleted,
}

/// Type-erased view of a pending record
#[async_trait]
pub(crate) trait PendingRecord: Send + Sync + fmt::Debug {
    fn entity_name(&self) -> String;
    fn record_id(&self) -> i32;
    fn capabilities(&self) -> Capabilities;
    fn auditable_mut(&mut self) -> Option<&mut dyn Auditable>;
    fn soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable>;
    fn as_any(&self) -> &dyn Any;

    /// Write this record; on success `self` holds the stored state.
    async fn write(
        &mut self,
        txn: &DatabaseTransaction,
        registry: &EntityRegistry,
        state: EntryState,
        expected: Option<&VersionToken>,
    ) -> Result<(), DomainError>;
}

#[async_trait]
impl<M: TrackedModel> PendingRecord for M {
    fn entity_name(&self) -> String {
        entity_name::<M>()
    }

    fn record_id(&self) -> i32 {
        self.id()
    }

    fn capabilities(&self) -> Capabilities {
        M::CAPABILITIES
    }

    fn auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        self.as_auditable_mut()
    }

    fn soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        self.as_soft_deletable_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn write(
        &mut self,
        txn: &DatabaseTransaction,
        registry: &EntityRegistry,
        state: EntryState,
        expected: Option<&VersionToken>,
    ) -> Result<(), DomainError> {
        match state {
            EntryState::Added => {
                *self = concurrency::insert(txn, &*self).await?;
            }
            EntryState::Modified => {
                *self = concurrency::update_if_current(txn, registry, &*self, expected).await?;
            }
            EntryState::SoftDeleted => {
                *self = concurrency::soft_delete_if_current(txn, registry, &*self, expected).await?;
            }
            EntryState::Deleted => {
                concurrency::delete_if_current(txn, registry, &*self, expected).await?;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) state: EntryState,
    pub(crate) expected: Option<VersionToken>,
    pub(crate) record: Box<dyn PendingRecord>,
    pub(crate) flushed: bool,
}

/// Typed reference to an entry queued in a [`UnitOfWork`]
pub struct EntryHandle<M> {
    index: usize,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for EntryHandle<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for EntryHandle<M> {}

impl<M> fmt::Debug for EntryHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHandle").field("index", &self.index).finish()
    }
}

pub struct UnitOfWork {
    txn: DatabaseTransaction,
    registry: Arc<EntityRegistry>,
    interceptor: MutationInterceptor,
    entries: Vec<Entry>,
    committed: Arc<AtomicBool>,
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("actor", &self.interceptor.audit().actor())
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    pub(crate) async fn begin(
        db: &DatabaseConnection,
        registry: Arc<EntityRegistry>,
        audit: AuditContext,
    ) -> Result<Self, DomainError> {
        let txn = db.begin().await?;
        Ok(Self {
            txn,
            registry,
            interceptor: MutationInterceptor::new(audit),
            entries: Vec::new(),
            committed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn audit(&self) -> &AuditContext {
        self.interceptor.audit()
    }

    /// Number of queued entries not yet written
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| !e.flushed).count()
    }

    /// Queue a new record. Its id and first version come from the store.
    pub fn add<M: TrackedModel>(&mut self, model: M) -> Result<EntryHandle<M>, DomainError> {
        self.registry.descriptor::<M>()?;
        if model.is_soft_deleted() {
            return Err(DomainError::Validation(format!(
                "cannot add a {} record that is already deleted",
                entity_name::<M>()
            )));
        }
        Ok(self.push(EntryState::Added, None, model))
    }

    /// Queue an update guarded by `expected`.
    ///
    /// The token is checked against the in-memory copy right away, and again by
    /// the conditional write at save time.
    pub fn update<M: TrackedModel>(
        &mut self,
        model: &M,
        expected: Option<&VersionToken>,
    ) -> Result<EntryHandle<M>, DomainError> {
        self.registry.descriptor::<M>()?;
        if model.is_soft_deleted() {
            return Err(DomainError::not_found(entity_name::<M>(), model.id()));
        }
        concurrency::ensure_expected_version(model, expected)?;
        Ok(self.push(EntryState::Modified, expected.cloned(), model.clone()))
    }

    /// Queue a delete guarded by the version the caller loaded.
    ///
    /// Soft-deletable types are turned into a soft delete at save time.
    pub fn delete<M: TrackedModel>(&mut self, model: &M) -> Result<EntryHandle<M>, DomainError> {
        self.registry.descriptor::<M>()?;
        if model.is_soft_deleted() {
            return Err(DomainError::not_found(entity_name::<M>(), model.id()));
        }
        let expected = model.version();
        concurrency::ensure_expected_version(model, expected.as_ref())?;
        Ok(self.push(EntryState::Deleted, expected, model.clone()))
    }

    fn push<M: TrackedModel>(
        &mut self,
        state: EntryState,
        expected: Option<VersionToken>,
        model: M,
    ) -> EntryHandle<M> {
        self.entries.push(Entry {
            state,
            expected,
            record: Box::new(model),
            flushed: false,
        });
        EntryHandle {
            index: self.entries.len() - 1,
            _model: PhantomData,
        }
    }

    /// Current in-memory state of a queued entry.
    ///
    /// After `save_changes` this is what the store holds, new version included.
    /// A physically deleted record keeps its last loaded state.
    pub fn entity<M: TrackedModel>(&self, handle: &EntryHandle<M>) -> Option<M> {
        self.entries
            .get(handle.index)?
            .record
            .as_any()
            .downcast_ref::<M>()
            .cloned()
    }

    /// Read through the default scope, inside this transaction.
    pub async fn fetch<M: TrackedModel>(&self, id: i32) -> Result<Option<M>, DomainError> {
        query::find_by_id(&self.txn, &self.registry, id, ReadScope::Default).await
    }

    pub async fn fetch_including_deleted<M: TrackedModel>(
        &self,
        id: i32,
    ) -> Result<Option<M>, DomainError> {
        query::find_by_id(&self.txn, &self.registry, id, ReadScope::IncludingDeleted).await
    }

    pub async fn find<M: TrackedModel>(&self, condition: Condition) -> Result<Vec<M>, DomainError> {
        query::find_where(&self.txn, &self.registry, condition, ReadScope::Default).await
    }

    /// Stamp and write every pending entry. Returns how many were written.
    ///
    /// The first rejected write aborts the batch; the transaction is left
    /// uncommitted so nothing of it becomes durable.
    pub async fn save_changes(&mut self) -> Result<usize, DomainError> {
        let pending = self.pending();
        if pending == 0 {
            return Ok(0);
        }

        let summary = self
            .interceptor
            .before_save(self.entries.iter_mut().filter(|e| !e.flushed))?;

        for entry in self.entries.iter_mut().filter(|e| !e.flushed) {
            entry
                .record
                .write(&self.txn, &self.registry, entry.state, entry.expected.as_ref())
                .await?;
            entry.flushed = true;
        }

        tracing::info!(
            "Saved {} change(s) for {} ({} soft delete(s))",
            pending,
            self.audit().actor(),
            summary.soft_deleted
        );
        Ok(pending)
    }

    /// Make every saved change durable.
    pub async fn commit(self) -> Result<(), DomainError> {
        let unsaved = self.pending();
        if unsaved > 0 {
            return Err(DomainError::Internal(format!(
                "commit with {} unsaved change(s); call save_changes first",
                unsaved
            )));
        }

        self.txn.commit().await?;
        self.committed.store(true, Ordering::Release);
        tracing::debug!("Unit of work committed ({} entries)", self.entries.len());
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), DomainError> {
        self.txn.rollback().await?;
        tracing::debug!("Unit of work rolled back ({} entries)", self.entries.len());
        Ok(())
    }

    pub(crate) fn commit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.committed)
    }
}
