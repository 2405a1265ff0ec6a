//! Entity store
//!
//! Entry point for every read and write of tracked entities. Writes run as
//! retryable units of work; reads go through the registry's default scope
//! unless an `_including_deleted` variant is used.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use sea_orm::{Condition, DatabaseConnection};

use super::concurrency;
use super::query::{self, ReadScope};
use super::registry::EntityRegistry;
use super::retry::{CancelSignal, RetryPolicy};
use super::tracked::{TrackedModel, entity_name};
use super::unit_of_work::UnitOfWork;
use crate::domain::{AuditContext, DomainError, VersionToken};

#[derive(Clone)]
pub struct EntityStore {
    db: DatabaseConnection,
    registry: Arc<EntityRegistry>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl EntityStore {
    pub fn new(db: DatabaseConnection, registry: Arc<EntityRegistry>, retry: RetryPolicy) -> Self {
        Self {
            db,
            registry,
            retry,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Open a unit of work without retry handling.
    pub async fn begin(&self, audit: AuditContext) -> Result<UnitOfWork, DomainError> {
        UnitOfWork::begin(&self.db, Arc::clone(&self.registry), audit).await
    }

    /// Run `operation` as a unit of work, replaying it on transient faults.
    ///
    /// Each attempt gets a fresh unit of work and must end with
    /// [`UnitOfWork::commit`]. A failed attempt is rolled back before the next
    /// one starts, so a replay never sees the partial writes of an earlier one.
    /// Conflict, NotFound and validation faults are returned immediately, and an
    /// attempt that already committed is never replayed.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        mut operation: F,
    ) -> Result<T, DomainError>
    where
        F: FnMut(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                tracing::info!("Unit of work cancelled before attempt {}", attempt);
                return Err(DomainError::Cancelled);
            }

            let outcome = match self.begin(audit.clone()).await {
                Ok(uow) => {
                    let committed = uow.commit_flag();
                    let result = operation(uow).await;
                    match (result, committed.load(Ordering::Acquire)) {
                        (Ok(_), false) => Err(DomainError::Internal(
                            "unit of work finished without committing".to_string(),
                        )),
                        (Err(e), true) => return Err(e),
                        (result, _) => result,
                    }
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("Unit of work succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    self.retry.backoff(attempt, e, cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Default-scope read: soft-deleted rows come back as `None`.
    pub async fn fetch<M: TrackedModel>(
        &self,
        cancel: &CancelSignal,
        id: i32,
    ) -> Result<Option<M>, DomainError> {
        cancellable(
            cancel,
            query::find_by_id(&self.db, &self.registry, id, ReadScope::Default),
        )
        .await
    }

    /// Administrative read that ignores the default scope.
    pub async fn fetch_including_deleted<M: TrackedModel>(
        &self,
        cancel: &CancelSignal,
        id: i32,
    ) -> Result<Option<M>, DomainError> {
        cancellable(
            cancel,
            query::find_by_id(&self.db, &self.registry, id, ReadScope::IncludingDeleted),
        )
        .await
    }

    pub async fn find<M: TrackedModel>(
        &self,
        cancel: &CancelSignal,
        condition: Condition,
    ) -> Result<Vec<M>, DomainError> {
        cancellable(
            cancel,
            query::find_where(&self.db, &self.registry, condition, ReadScope::Default),
        )
        .await
    }

    pub async fn find_including_deleted<M: TrackedModel>(
        &self,
        cancel: &CancelSignal,
        condition: Condition,
    ) -> Result<Vec<M>, DomainError> {
        cancellable(
            cancel,
            query::find_where(&self.db, &self.registry, condition, ReadScope::IncludingDeleted),
        )
        .await
    }

    /// Insert `entity` and return it with its store-assigned id and version.
    pub async fn add<M: TrackedModel>(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        entity: M,
    ) -> Result<M, DomainError> {
        self.execute_with_retry(audit, cancel, |mut uow| {
            let entity = entity.clone();
            async move {
                let handle = uow.add(entity)?;
                uow.save_changes().await?;
                let saved = saved_state(&uow, &handle)?;
                uow.commit().await?;
                Ok(saved)
            }
        })
        .await
    }

    /// Persist `entity` only if the stored version still equals `expected`.
    ///
    /// Returns the stored state carrying the new version token.
    pub async fn update<M: TrackedModel>(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        entity: &M,
        expected: Option<&VersionToken>,
    ) -> Result<M, DomainError> {
        // Stale callers fail here, before a transaction is opened
        concurrency::ensure_expected_version(entity, expected)?;

        self.execute_with_retry(audit, cancel, |mut uow| {
            let entity = entity.clone();
            let expected = expected.cloned();
            async move {
                let handle = uow.update(&entity, expected.as_ref())?;
                uow.save_changes().await?;
                let saved = saved_state(&uow, &handle)?;
                uow.commit().await?;
                Ok(saved)
            }
        })
        .await
    }

    /// Delete `entity`, guarded by the version it was loaded with.
    ///
    /// Soft-deletable types are flagged and stamped instead of removed.
    pub async fn delete<M: TrackedModel>(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        entity: &M,
    ) -> Result<(), DomainError> {
        self.execute_with_retry(audit, cancel, |mut uow| {
            let entity = entity.clone();
            async move {
                uow.delete(&entity)?;
                uow.save_changes().await?;
                uow.commit().await
            }
        })
        .await
    }
}

/// Run a read unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancelSignal,
    read: impl Future<Output = Result<T, DomainError>>,
) -> Result<T, DomainError> {
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }

    tokio::select! {
        result = read => result,
        _ = cancel.cancelled() => {
            tracing::info!("Read cancelled");
            Err(DomainError::Cancelled)
        }
    }
}

fn saved_state<M: TrackedModel>(
    uow: &UnitOfWork,
    handle: &super::unit_of_work::EntryHandle<M>,
) -> Result<M, DomainError> {
    uow.entity(handle).ok_or_else(|| {
        DomainError::Internal(format!("lost track of a queued {} entry", entity_name::<M>()))
    })
}
