//! SeaORM implementation of ProductRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition};

use crate::domain::{
    AuditContext, CreateProductInput, DomainError, ProductFilter, ProductRepository,
    UpdateProductInput, VersionToken,
};
use crate::infrastructure::persistence::{CancelSignal, EntityStore, ensure_expected_version};
use crate::models::Product;
use crate::models::product::{Column, Model};

/// Product repository backed by the entity store
pub struct SeaOrmProductRepository {
    store: EntityStore,
}

impl SeaOrmProductRepository {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    async fn load(&self, cancel: &CancelSignal, id: i32) -> Result<Model, DomainError> {
        self.store
            .fetch::<Model>(cancel, id)
            .await?
            .ok_or_else(|| DomainError::not_found("products", id))
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> Result<(), DomainError> {
    if price_cents < 0 {
        return Err(DomainError::Validation(
            "price_cents must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ProductRepository for SeaOrmProductRepository {
    async fn find_all(
        &self,
        cancel: &CancelSignal,
        filter: ProductFilter,
    ) -> Result<Vec<Product>, DomainError> {
        let mut condition = Condition::all();

        if let Some(q) = &filter.query
            && !q.trim().is_empty()
        {
            let q = q.trim();
            condition = condition.add(
                Condition::any()
                    .add(Column::Name.contains(q))
                    .add(Column::Sku.contains(q)),
            );
        }

        let products = if filter.include_deleted {
            self.store
                .find_including_deleted::<Model>(cancel, condition)
                .await?
        } else {
            self.store.find::<Model>(cancel, condition).await?
        };

        Ok(products.into_iter().map(Product::from).collect())
    }

    async fn find_by_id(
        &self,
        cancel: &CancelSignal,
        id: i32,
    ) -> Result<Option<Product>, DomainError> {
        Ok(self.store.fetch::<Model>(cancel, id).await?.map(Product::from))
    }

    async fn find_by_id_including_deleted(
        &self,
        cancel: &CancelSignal,
        id: i32,
    ) -> Result<Option<Product>, DomainError> {
        Ok(self
            .store
            .fetch_including_deleted::<Model>(cancel, id)
            .await?
            .map(Product::from))
    }

    async fn create(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        input: CreateProductInput,
    ) -> Result<Product, DomainError> {
        if input.sku.trim().is_empty() {
            return Err(DomainError::Validation("sku must not be empty".to_string()));
        }
        validate_name(&input.name)?;
        validate_price(input.price_cents)?;

        let mut draft = Model::draft(input.sku.trim(), input.name.trim(), input.price_cents);
        draft.description = input.description;

        let saved = self.store.add(audit, cancel, draft).await?;
        tracing::info!("Product #{} ({}) created by {}", saved.id, saved.sku, audit.actor());

        Ok(saved.into())
    }

    async fn update(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        id: i32,
        input: UpdateProductInput,
        expected: VersionToken,
    ) -> Result<Product, DomainError> {
        let current = self.load(cancel, id).await?;

        // Reject a stale caller before any of their input is applied
        ensure_expected_version(&current, Some(&expected))?;

        let mut changed = current;
        if let Some(name) = input.name {
            validate_name(&name)?;
            changed.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            changed.description = description;
        }
        if let Some(price_cents) = input.price_cents {
            validate_price(price_cents)?;
            changed.price_cents = price_cents;
        }

        let saved = self
            .store
            .update(audit, cancel, &changed, Some(&expected))
            .await?;
        Ok(saved.into())
    }

    async fn delete(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        id: i32,
        expected: Option<VersionToken>,
    ) -> Result<(), DomainError> {
        let current = self.load(cancel, id).await?;
        if let Some(expected) = &expected {
            ensure_expected_version(&current, Some(expected))?;
        }

        self.store.delete(audit, cancel, &current).await?;
        tracing::info!("Product #{} deleted by {}", id, audit.actor());
        Ok(())
    }
}
