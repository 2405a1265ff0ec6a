//! Optimistic concurrency checks
//!
//! Two checks guard every versioned write:
//! - [`ensure_expected_version`] compares tokens in memory before anything is
//!   mutated, so a stale caller fails fast with nothing to undo.
//! - the conditional writes below put the same comparison into the `WHERE`
//!   clause, which is the only place the check-and-write is atomic. When they
//!   touch zero rows, [`explain_rejection`] probes through the default scope
//!   to tell Conflict (still there, changed) from NotFound (gone or deleted).

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IdenStatic, Iterable,
    QueryFilter,
};

use super::registry::EntityRegistry;
use super::tracked::{ColumnOf, TrackedModel, column, entity_name, value_of};
use crate::domain::contracts::layout;
use crate::domain::{DomainError, VersionToken};

/// Which non-key columns a conditional update writes
#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteSet {
    /// Every column except these
    AllExcept(&'static [&'static str]),
    /// Only these columns
    Only(&'static [&'static str]),
}

impl WriteSet {
    fn includes(&self, name: &str) -> bool {
        match self {
            WriteSet::AllExcept(skip) => !skip.contains(&name),
            WriteSet::Only(keep) => keep.contains(&name),
        }
    }
}

/// Early, in-memory check of the caller's expected version.
///
/// Versioned types need a non-empty expected token; unversioned types must
/// not be given one.
pub fn ensure_expected_version<M: TrackedModel>(
    model: &M,
    expected: Option<&VersionToken>,
) -> Result<(), DomainError> {
    match (model.version(), expected) {
        (Some(current), Some(expected)) => {
            if expected.is_empty() {
                return Err(DomainError::Validation(
                    "expected version must not be empty".to_string(),
                ));
            }
            if current != *expected {
                tracing::debug!(
                    "Early version check failed for {} #{}: expected {}, current {}",
                    entity_name::<M>(),
                    model.id(),
                    expected,
                    current
                );
                return Err(DomainError::conflict(entity_name::<M>(), model.id()));
            }
            Ok(())
        }
        (Some(_), None) => Err(DomainError::Validation(format!(
            "updating {} requires an expected version",
            entity_name::<M>()
        ))),
        (None, Some(_)) => Err(DomainError::Validation(format!(
            "{} is not versioned; no expected version may be supplied",
            entity_name::<M>()
        ))),
        (None, None) => Ok(()),
    }
}

/// Insert `model`, letting the store assign the id and first version.
///
/// Modification and deletion stamps the caller filled in are dropped; a new
/// row only carries its creation stamp.
pub(crate) async fn insert<M: TrackedModel>(
    txn: &DatabaseTransaction,
    model: &M,
) -> Result<M, DomainError> {
    let mut active: M::ActiveModel = model.clone().into();
    active.not_set(column::<M>(layout::ID)?);
    if M::CAPABILITIES.versioned {
        active.not_set(column::<M>(layout::ROW_VERSION)?);
    }
    if M::CAPABILITIES.auditable {
        for name in layout::MODIFICATION {
            active.not_set(column::<M>(name)?);
        }
    }
    if M::CAPABILITIES.soft_deletable {
        for name in layout::DELETION {
            active.not_set(column::<M>(name)?);
        }
    }

    let result = M::Entity::insert(active).exec(txn).await?;

    M::Entity::find_by_id(result.last_insert_id)
        .one(txn)
        .await?
        .ok_or_else(|| {
            DomainError::Internal(format!(
                "{} row vanished right after insert",
                entity_name::<M>()
            ))
        })
}

/// `UPDATE … WHERE id = ? [AND row_version = ?] [AND is_deleted = false]`
async fn write_if_current<M: TrackedModel>(
    txn: &DatabaseTransaction,
    model: &M,
    expected: Option<&VersionToken>,
    writes: WriteSet,
) -> Result<u64, DomainError> {
    let mut update = M::Entity::update_many().filter(column::<M>(layout::ID)?.eq(model.id()));

    if let Some(expected) = expected {
        update = update.filter(column::<M>(layout::ROW_VERSION)?.eq(expected.as_bytes().to_vec()));
    }
    if M::CAPABILITIES.soft_deletable {
        update = update.filter(column::<M>(layout::IS_DELETED)?.eq(false));
    }

    for col in <ColumnOf<M> as Iterable>::iter() {
        if writes.includes(col.as_str()) {
            update = update.col_expr(col, SimpleExpr::Value(value_of(model, col)?));
        }
    }

    Ok(update.exec(txn).await?.rows_affected)
}

/// Conditionally write the caller's field changes.
pub(crate) async fn update_if_current<M: TrackedModel>(
    txn: &DatabaseTransaction,
    registry: &EntityRegistry,
    model: &M,
    expected: Option<&VersionToken>,
) -> Result<M, DomainError> {
    let rows = write_if_current(txn, model, expected, WriteSet::AllExcept(layout::MANAGED)).await?;
    if rows == 0 {
        return Err(explain_rejection::<M>(txn, registry, model.id()).await);
    }
    reload(txn, model.id()).await
}

/// Conditionally write only the soft-delete and modification stamps.
pub(crate) async fn soft_delete_if_current<M: TrackedModel>(
    txn: &DatabaseTransaction,
    registry: &EntityRegistry,
    model: &M,
    expected: Option<&VersionToken>,
) -> Result<M, DomainError> {
    let rows = write_if_current(txn, model, expected, WriteSet::Only(layout::SOFT_DELETE)).await?;
    if rows == 0 {
        return Err(explain_rejection::<M>(txn, registry, model.id()).await);
    }
    reload(txn, model.id()).await
}

/// Physically delete a row of a type that cannot be soft-deleted.
pub(crate) async fn delete_if_current<M: TrackedModel>(
    txn: &DatabaseTransaction,
    registry: &EntityRegistry,
    model: &M,
    expected: Option<&VersionToken>,
) -> Result<(), DomainError> {
    let mut delete = M::Entity::delete_many().filter(column::<M>(layout::ID)?.eq(model.id()));
    if let Some(expected) = expected {
        delete = delete.filter(column::<M>(layout::ROW_VERSION)?.eq(expected.as_bytes().to_vec()));
    }

    if delete.exec(txn).await?.rows_affected == 0 {
        return Err(explain_rejection::<M>(txn, registry, model.id()).await);
    }
    Ok(())
}

/// Classify a conditional write that matched no row.
async fn explain_rejection<M: TrackedModel>(
    txn: &DatabaseTransaction,
    registry: &EntityRegistry,
    id: i32,
) -> DomainError {
    let probe = async {
        let select =
            registry.scoped::<M>(M::Entity::find().filter(column::<M>(layout::ID)?.eq(id)))?;
        Ok::<_, DomainError>(select.one(txn).await?.is_some())
    };

    match probe.await {
        Ok(true) => {
            tracing::warn!(
                "Conditional write rejected: {} #{} was changed concurrently",
                entity_name::<M>(),
                id
            );
            DomainError::conflict(entity_name::<M>(), id)
        }
        Ok(false) => {
            tracing::warn!(
                "Conditional write rejected: {} #{} no longer exists",
                entity_name::<M>(),
                id
            );
            DomainError::not_found(entity_name::<M>(), id)
        }
        Err(e) => e,
    }
}

/// Read back the committed state, including the store-issued token.
async fn reload<M: TrackedModel>(txn: &DatabaseTransaction, id: i32) -> Result<M, DomainError> {
    M::Entity::find()
        .filter(column::<M>(layout::ID)?.eq(id))
        .one(txn)
        .await?
        .ok_or_else(|| DomainError::not_found(entity_name::<M>(), id))
}
