use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{AuditStamp, Auditable, Capabilities, SoftDeletable, VersionToken, Versioned};
use crate::infrastructure::persistence::TrackedModel;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub row_version: Vec<u8>,
    pub created_at: Option<DateTimeUtc>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTimeUtc>,
    pub modified_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Unsaved product; id, version and stamps are filled in by the store.
    pub fn draft(sku: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: 0,
            sku: sku.into(),
            name: name.into(),
            description: None,
            price_cents,
            row_version: Vec::new(),
            created_at: None,
            created_by: None,
            modified_at: None,
            modified_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

impl Versioned for Model {
    fn version_token(&self) -> VersionToken {
        VersionToken::from_store(self.row_version.clone())
    }
}

impl Auditable for Model {
    fn created(&self) -> Option<AuditStamp> {
        stamp(self.created_at, &self.created_by)
    }

    fn modified(&self) -> Option<AuditStamp> {
        stamp(self.modified_at, &self.modified_by)
    }

    fn stamp_created(&mut self, stamp: &AuditStamp) {
        self.created_at = Some(stamp.at);
        self.created_by = Some(stamp.by.clone());
    }

    fn stamp_modified(&mut self, stamp: &AuditStamp) {
        self.modified_at = Some(stamp.at);
        self.modified_by = Some(stamp.by.clone());
    }
}

impl SoftDeletable for Model {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn deletion(&self) -> Option<AuditStamp> {
        stamp(self.deleted_at, &self.deleted_by)
    }

    fn mark_deleted(&mut self, stamp: &AuditStamp) {
        self.is_deleted = true;
        self.deleted_at = Some(stamp.at);
        self.deleted_by = Some(stamp.by.clone());
    }
}

impl TrackedModel for Model {
    type Entity = Entity;
    type ActiveModel = ActiveModel;

    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn id(&self) -> i32 {
        self.id
    }

    fn as_versioned(&self) -> Option<&dyn Versioned> {
        Some(self)
    }

    fn as_auditable(&self) -> Option<&dyn Auditable> {
        Some(self)
    }

    fn as_auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        Some(self)
    }

    fn as_soft_deletable(&self) -> Option<&dyn SoftDeletable> {
        Some(self)
    }

    fn as_soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        Some(self)
    }
}

pub(crate) fn stamp(at: Option<DateTimeUtc>, by: &Option<String>) -> Option<AuditStamp> {
    match (at, by) {
        (Some(at), Some(by)) => Some(AuditStamp { at, by: by.clone() }),
        _ => None,
    }
}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Hex version token; send it back as `If-Match` to update or delete
    pub version: String,
    pub created_at: Option<DateTimeUtc>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTimeUtc>,
    pub modified_by: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTimeUtc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            description: model.description,
            price_cents: model.price_cents,
            version: hex::encode(&model.row_version),
            created_at: model.created_at,
            created_by: model.created_by,
            modified_at: model.modified_at,
            modified_by: model.modified_by,
            is_deleted: model.is_deleted,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
        }
    }
}
