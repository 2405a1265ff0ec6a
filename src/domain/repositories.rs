//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::{AuditContext, DomainError, VersionToken};
use crate::infrastructure::persistence::CancelSignal;
use crate::models::product::Product;

/// Filter criteria for product queries
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    /// Substring match on name or SKU
    pub query: Option<String>,
    /// Administrative view: also return soft-deleted products
    pub include_deleted: bool,
}

/// Input for creating a product
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
}

/// Repository trait for Product entity
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find all products matching the filter
    async fn find_all(
        &self,
        cancel: &CancelSignal,
        filter: ProductFilter,
    ) -> Result<Vec<Product>, DomainError>;

    /// Find a live product by ID
    async fn find_by_id(&self, cancel: &CancelSignal, id: i32)
    -> Result<Option<Product>, DomainError>;

    /// Find a product by ID whether or not it has been deleted
    async fn find_by_id_including_deleted(
        &self,
        cancel: &CancelSignal,
        id: i32,
    ) -> Result<Option<Product>, DomainError>;

    /// Create a new product
    async fn create(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        input: CreateProductInput,
    ) -> Result<Product, DomainError>;

    /// Update a product the caller last saw at `expected`
    async fn update(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        id: i32,
        input: UpdateProductInput,
        expected: VersionToken,
    ) -> Result<Product, DomainError>;

    /// Soft-delete a product, optionally guarded by the version the caller saw
    async fn delete(
        &self,
        audit: &AuditContext,
        cancel: &CancelSignal,
        id: i32,
        expected: Option<VersionToken>,
    ) -> Result<(), DomainError>;
}
