//! Mutation interceptor
//!
//! Runs once per `save_changes` batch, before anything reaches the store.
//! Added auditable records get their creation stamp, modified ones their
//! modification stamp, and deletes of soft-deletable records are rewritten
//! into soft-delete updates so the store never sees a DELETE for those types.

use super::unit_of_work::{Entry, EntryState, PendingRecord};
use crate::domain::{AuditContext, AuditStamp, Auditable, DomainError, SoftDeletable};

/// What one interceptor pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterceptSummary {
    pub created: usize,
    pub modified: usize,
    pub soft_deleted: usize,
    pub hard_deleted: usize,
}

impl InterceptSummary {
    pub fn total(&self) -> usize {
        self.created + self.modified + self.soft_deleted + self.hard_deleted
    }
}

#[derive(Debug, Clone)]
pub struct MutationInterceptor {
    audit: AuditContext,
}

impl MutationInterceptor {
    pub fn new(audit: AuditContext) -> Self {
        Self { audit }
    }

    pub fn audit(&self) -> &AuditContext {
        &self.audit
    }

    /// Stamp and rewrite a batch of pending entries in place.
    ///
    /// The clock is read once, so every entry of a batch carries the same time.
    pub(crate) fn before_save<'a, I>(&self, entries: I) -> Result<InterceptSummary, DomainError>
    where
        I: IntoIterator<Item = &'a mut Entry>,
    {
        let stamp = self.audit.stamp();
        let mut summary = InterceptSummary::default();

        for entry in entries {
            let caps = entry.record.capabilities();

            match entry.state {
                EntryState::Added => {
                    if caps.auditable {
                        auditable(entry.record.as_mut())?.stamp_created(&stamp);
                    }
                    summary.created += 1;
                }
                EntryState::Modified => {
                    if caps.auditable {
                        auditable(entry.record.as_mut())?.stamp_modified(&stamp);
                    }
                    summary.modified += 1;
                }
                EntryState::Deleted | EntryState::SoftDeleted if caps.soft_deletable => {
                    soft_delete(entry, &stamp, caps.auditable)?;
                    summary.soft_deleted += 1;
                }
                EntryState::Deleted | EntryState::SoftDeleted => {
                    summary.hard_deleted += 1;
                }
            }
        }

        tracing::debug!(
            "Interceptor ({}): {} created, {} modified, {} soft-deleted, {} hard-deleted",
            stamp.by,
            summary.created,
            summary.modified,
            summary.soft_deleted,
            summary.hard_deleted
        );

        Ok(summary)
    }
}

fn soft_delete(entry: &mut Entry, stamp: &AuditStamp, auditable_too: bool) -> Result<(), DomainError> {
    soft_deletable(entry.record.as_mut())?.mark_deleted(stamp);
    if auditable_too {
        auditable(entry.record.as_mut())?.stamp_modified(stamp);
    }

    if entry.state == EntryState::Deleted {
        tracing::debug!(
            "Rewriting delete of {} #{} into a soft delete",
            entry.record.entity_name(),
            entry.record.record_id()
        );
        entry.state = EntryState::SoftDeleted;
    }
    Ok(())
}

fn auditable(record: &mut dyn PendingRecord) -> Result<&mut dyn Auditable, DomainError> {
    let name = record.entity_name();
    record
        .auditable_mut()
        .ok_or_else(|| DomainError::Internal(format!("{} declares auditing but is not Auditable", name)))
}

fn soft_deletable(record: &mut dyn PendingRecord) -> Result<&mut dyn SoftDeletable, DomainError> {
    let name = record.entity_name();
    record.soft_deletable_mut().ok_or_else(|| {
        DomainError::Internal(format!(
            "{} declares soft deletion but is not SoftDeletable",
            name
        ))
    })
}
