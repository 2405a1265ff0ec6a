//! Capability contracts an entity type may opt into
//!
//! The three capabilities are independent. A type declares which ones it
//! carries through [`Capabilities`] and exposes them through the matching
//! trait; the persistence layer only ever talks to entities through these.

use chrono::{DateTime, Utc};

use super::VersionToken;

/// Column names every persisted entity uses for the capabilities it carries.
pub mod layout {
    pub const ID: &str = "id";
    pub const ROW_VERSION: &str = "row_version";
    pub const CREATED_AT: &str = "created_at";
    pub const CREATED_BY: &str = "created_by";
    pub const MODIFIED_AT: &str = "modified_at";
    pub const MODIFIED_BY: &str = "modified_by";
    pub const IS_DELETED: &str = "is_deleted";
    pub const DELETED_AT: &str = "deleted_at";
    pub const DELETED_BY: &str = "deleted_by";

    /// Columns a plain update must never write.
    pub const MANAGED: &[&str] = &[
        ID,
        ROW_VERSION,
        CREATED_AT,
        CREATED_BY,
        IS_DELETED,
        DELETED_AT,
        DELETED_BY,
    ];

    pub const MODIFICATION: &[&str] = &[MODIFIED_AT, MODIFIED_BY];
    pub const DELETION: &[&str] = &[IS_DELETED, DELETED_AT, DELETED_BY];

    /// Columns a soft-delete update writes.
    pub const SOFT_DELETE: &[&str] = &[IS_DELETED, DELETED_AT, DELETED_BY, MODIFIED_AT, MODIFIED_BY];
}

/// Which contracts an entity type implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub versioned: bool,
    pub auditable: bool,
    pub soft_deletable: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        versioned: false,
        auditable: false,
        soft_deletable: false,
    };

    pub const ALL: Capabilities = Capabilities {
        versioned: true,
        auditable: true,
        soft_deletable: true,
    };

    pub const fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }

    pub const fn auditable(mut self) -> Self {
        self.auditable = true;
        self
    }

    pub const fn soft_deletable(mut self) -> Self {
        self.soft_deletable = true;
        self
    }
}

/// Who did something, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub at: DateTime<Utc>,
    pub by: String,
}

/// Entity carrying a store-issued [`VersionToken`].
pub trait Versioned {
    fn version_token(&self) -> VersionToken;
}

/// Entity carrying creation and last-modification stamps.
pub trait Auditable {
    fn created(&self) -> Option<AuditStamp>;
    fn modified(&self) -> Option<AuditStamp>;
    fn stamp_created(&mut self, stamp: &AuditStamp);
    fn stamp_modified(&mut self, stamp: &AuditStamp);
}

/// Entity that is hidden instead of removed.
pub trait SoftDeletable {
    fn is_deleted(&self) -> bool;
    fn deletion(&self) -> Option<AuditStamp>;
    /// Irreversible through this crate.
    fn mark_deleted(&mut self, stamp: &AuditStamp);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_compose() {
        const AUDITED: Capabilities = Capabilities::NONE.auditable().soft_deletable();
        assert!(!AUDITED.versioned);
        assert!(AUDITED.auditable);
        assert!(AUDITED.soft_deletable);
        assert_eq!(
            Capabilities::NONE.versioned().auditable().soft_deletable(),
            Capabilities::ALL
        );
    }

    #[test]
    fn test_plain_updates_never_touch_managed_columns() {
        assert!(layout::MANAGED.contains(&layout::ROW_VERSION));
        assert!(layout::MANAGED.contains(&layout::CREATED_AT));
        assert!(layout::MANAGED.contains(&layout::IS_DELETED));
        assert!(!layout::MANAGED.contains(&layout::MODIFIED_AT));
    }
}
