//! Access role: audited and soft-deletable, but not versioned.
//! Concurrent edits to a role are last-writer-wins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::product::stamp;
use crate::domain::{AuditStamp, Auditable, Capabilities, SoftDeletable};
use crate::infrastructure::persistence::TrackedModel;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    /// JSON array of permission names
    pub permissions: String,
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
    pub fn draft(name: impl Into<String>, permissions: &[&str]) -> Self {
        Self {
            id: 0,
            name: name.into(),
            permissions: serde_json::to_string(permissions).unwrap_or_else(|_| "[]".to_string()),
            created_at: None,
            created_by: None,
            modified_at: None,
            modified_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn permission_list(&self) -> Vec<String> {
        serde_json::from_str(&self.permissions).unwrap_or_default()
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

    const CAPABILITIES: Capabilities = Capabilities::NONE.auditable().soft_deletable();

    fn id(&self) -> i32 {
        self.id
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
