//! Reads that honor (or deliberately bypass) the default scope

use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use super::registry::EntityRegistry;
use super::tracked::{TrackedModel, column};
use crate::domain::DomainError;
use crate::domain::contracts::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Soft-deleted rows are invisible
    Default,
    /// Administrative view, nothing is hidden
    IncludingDeleted,
}

pub(crate) async fn find_by_id<M, C>(
    conn: &C,
    registry: &EntityRegistry,
    id: i32,
    scope: ReadScope,
) -> Result<Option<M>, DomainError>
where
    M: TrackedModel,
    C: ConnectionTrait,
{
    let select = M::Entity::find().filter(column::<M>(layout::ID)?.eq(id));
    let select = match scope {
        ReadScope::Default => registry.scoped::<M>(select)?,
        ReadScope::IncludingDeleted => {
            registry.descriptor::<M>()?;
            select
        }
    };

    Ok(select.one(conn).await?)
}

pub(crate) async fn find_where<M, C>(
    conn: &C,
    registry: &EntityRegistry,
    condition: Condition,
    scope: ReadScope,
) -> Result<Vec<M>, DomainError>
where
    M: TrackedModel,
    C: ConnectionTrait,
{
    let select = M::Entity::find()
        .filter(condition)
        .order_by_asc(column::<M>(layout::ID)?);
    let select = match scope {
        ReadScope::Default => registry.scoped::<M>(select)?,
        ReadScope::IncludingDeleted => {
            registry.descriptor::<M>()?;
            select
        }
    };

    Ok(select.all(conn).await?)
}
