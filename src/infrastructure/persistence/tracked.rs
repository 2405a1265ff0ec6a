//! Bridge between SeaORM models and the capability contracts

use std::fmt;
use std::str::FromStr;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityName, EntityTrait, FromQueryResult, IdenStatic,
    Value,
};

use crate::domain::{Auditable, Capabilities, DomainError, SoftDeletable, VersionToken, Versioned};

/// Column enum of a tracked model's entity.
pub type ColumnOf<M> = <<M as TrackedModel>::Entity as EntityTrait>::Column;

/// A SeaORM model that goes through the unit of work.
///
/// `CAPABILITIES` must agree with the `as_*` accessors: a type that declares
/// itself versioned returns `Some` from `as_versioned`, and so on.
pub trait TrackedModel: FromQueryResult + Clone + Send + Sync + fmt::Debug + 'static {
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + From<Self>
        + Send
        + 'static;

    const CAPABILITIES: Capabilities;

    fn id(&self) -> i32;

    fn as_versioned(&self) -> Option<&dyn Versioned> {
        None
    }

    fn as_auditable(&self) -> Option<&dyn Auditable> {
        None
    }

    fn as_auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        None
    }

    fn as_soft_deletable(&self) -> Option<&dyn SoftDeletable> {
        None
    }

    fn as_soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        None
    }

    fn version(&self) -> Option<VersionToken> {
        self.as_versioned().map(|v| v.version_token())
    }

    fn is_soft_deleted(&self) -> bool {
        self.as_soft_deletable().is_some_and(|s| s.is_deleted())
    }
}

/// Table name of `M`, used in errors and logs.
pub fn entity_name<M: TrackedModel>() -> String {
    <M::Entity as Default>::default().table_name().to_string()
}

/// Resolve one of the layout columns on `M`.
pub fn column<M: TrackedModel>(name: &str) -> Result<ColumnOf<M>, DomainError> {
    <ColumnOf<M> as FromStr>::from_str(name).map_err(|_| {
        DomainError::Internal(format!(
            "`{}` has no `{}` column",
            entity_name::<M>(),
            name
        ))
    })
}

/// Current in-memory value of `col` on `model`.
pub(crate) fn value_of<M: TrackedModel>(
    model: &M,
    col: ColumnOf<M>,
) -> Result<Value, DomainError> {
    M::ActiveModel::from(model.clone())
        .get(col)
        .into_value()
        .ok_or_else(|| {
            DomainError::Internal(format!(
                "`{}` has no value for `{}`",
                entity_name::<M>(),
                col.as_str()
            ))
        })
}
