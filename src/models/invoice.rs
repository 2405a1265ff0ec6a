//! Invoice: versioned and audited. Invoices are voided, not hidden, so a
//! delete removes the row for good.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::product::stamp;
use crate::domain::{AuditStamp, Auditable, Capabilities, VersionToken, Versioned};
use crate::infrastructure::persistence::TrackedModel;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub number: String,
    pub customer: String,
    pub amount_cents: i64,
    pub status: String,
    #[serde(skip)]
    pub row_version: Vec<u8>,
    pub created_at: Option<DateTimeUtc>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTimeUtc>,
    pub modified_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn draft(number: impl Into<String>, customer: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            id: 0,
            number: number.into(),
            customer: customer.into(),
            amount_cents,
            status: "draft".to_string(),
            row_version: Vec::new(),
            created_at: None,
            created_by: None,
            modified_at: None,
            modified_by: None,
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

impl TrackedModel for Model {
    type Entity = Entity;
    type ActiveModel = ActiveModel;

    const CAPABILITIES: Capabilities = Capabilities::NONE.versioned().auditable();

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
}
