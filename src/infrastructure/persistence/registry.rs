//! Entity registry and default-scope query filters
//!
//! Built once at startup and shared read-only afterwards. Every tracked type
//! is registered here; soft-deletable types additionally get a default scope
//! (`is_deleted = false`) that every read goes through unless the caller asks
//! for an unfiltered, administrative view.

use std::any::TypeId;
use std::collections::HashMap;

use sea_orm::{ColumnTrait, Condition, QueryFilter, Select};

use super::tracked::{TrackedModel, column, entity_name};
use crate::domain::contracts::layout;
use crate::domain::{Capabilities, DomainError};
use crate::models::{invoice, product, role};

/// What the registry knows about one entity type
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub table: String,
    pub capabilities: Capabilities,
    default_scope: Option<Condition>,
}

impl EntityDescriptor {
    /// Predicate hiding soft-deleted rows, if the type has one
    pub fn default_scope(&self) -> Option<&Condition> {
        self.default_scope.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: HashMap<TypeId, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Registry for every entity type the application persists.
    pub fn bootstrap() -> Result<Self, DomainError> {
        let registry = Self::builder()
            .register::<product::Model>()?
            .register::<role::Model>()?
            .register::<invoice::Model>()?
            .build();

        tracing::info!(
            "Entity registry ready: {} types, {} with a default scope",
            registry.len(),
            registry
                .entries
                .values()
                .filter(|d| d.default_scope.is_some())
                .count()
        );

        Ok(registry)
    }

    pub fn descriptor<M: TrackedModel>(&self) -> Result<&EntityDescriptor, DomainError> {
        self.entries.get(&TypeId::of::<M>()).ok_or_else(|| {
            DomainError::Internal(format!(
                "entity type `{}` is not registered",
                entity_name::<M>()
            ))
        })
    }

    /// Apply the default scope of `M` to `select`.
    pub fn scoped<M: TrackedModel>(
        &self,
        select: Select<M::Entity>,
    ) -> Result<Select<M::Entity>, DomainError> {
        let descriptor = self.descriptor::<M>()?;
        Ok(match descriptor.default_scope() {
            Some(scope) => select.filter(scope.clone()),
            None => select,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    entries: HashMap<TypeId, EntityDescriptor>,
}

impl EntityRegistryBuilder {
    /// Register `M`, checking that it has the columns its capabilities need.
    pub fn register<M: TrackedModel>(mut self) -> Result<Self, DomainError> {
        let caps = M::CAPABILITIES;

        column::<M>(layout::ID)?;
        if caps.versioned {
            column::<M>(layout::ROW_VERSION)?;
        }
        if caps.auditable {
            for name in [
                layout::CREATED_AT,
                layout::CREATED_BY,
                layout::MODIFIED_AT,
                layout::MODIFIED_BY,
            ] {
                column::<M>(name)?;
            }
        }

        let default_scope = if caps.soft_deletable {
            column::<M>(layout::DELETED_AT)?;
            column::<M>(layout::DELETED_BY)?;
            let is_deleted = column::<M>(layout::IS_DELETED)?;
            Some(Condition::all().add(is_deleted.eq(false)))
        } else {
            None
        };

        let descriptor = EntityDescriptor {
            table: entity_name::<M>(),
            capabilities: caps,
            default_scope,
        };
        tracing::debug!("Registered entity {:?}", descriptor);

        self.entries.insert(TypeId::of::<M>(), descriptor);
        Ok(self)
    }

    pub fn build(self) -> EntityRegistry {
        EntityRegistry {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryTrait};

    #[test]
    fn test_bootstrap_registers_known_types() {
        let registry = EntityRegistry::bootstrap().unwrap();
        assert_eq!(registry.len(), 3);

        let products = registry.descriptor::<product::Model>().unwrap();
        assert_eq!(products.table, "products");
        assert!(products.default_scope().is_some());

        let invoices = registry.descriptor::<invoice::Model>().unwrap();
        assert!(invoices.default_scope().is_none());
    }

    #[test]
    fn test_unregistered_type_is_rejected() {
        let registry = EntityRegistry::builder()
            .register::<product::Model>()
            .unwrap()
            .build();

        let err = registry.descriptor::<role::Model>().unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn test_default_scope_composes_with_caller_predicate() {
        let registry = EntityRegistry::bootstrap().unwrap();
        let select = product::Entity::find().filter(product::Column::Sku.eq("SKU-1"));

        let sql = registry
            .scoped::<product::Model>(select)
            .unwrap()
            .build(DbBackend::Sqlite)
            .to_string();

        assert!(sql.contains(r#""products"."sku" = 'SKU-1'"#), "{}", sql);
        assert!(sql.contains(r#""products"."is_deleted" = "#), "{}", sql);
        assert!(sql.contains(" AND "), "{}", sql);
    }
}
