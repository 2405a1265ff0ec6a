//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! Storage errors are classified on conversion so the retry policy only ever
//! has to ask [`DomainError::is_transient`].

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// SQLite result codes that mean "try again": BUSY, LOCKED and their
/// extended variants (BUSY_RECOVERY, BUSY_SNAPSHOT, LOCKED_SHAREDCACHE).
const SQLITE_RETRYABLE_CODES: &[&str] = &["5", "6", "261", "262", "517"];

#[derive(Debug, Error)]
pub enum DomainError {
    /// The caller's expected version no longer matches the stored one
    #[error("{entity} #{id} was modified by another writer")]
    Conflict { entity: String, id: i32 },

    /// The record does not exist, or it has been soft-deleted
    #[error("{entity} #{id} not found")]
    NotFound { entity: String, id: i32 },

    /// Malformed input, rejected before any store interaction
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connectivity loss, timeout or lock contention
    #[error("Transient storage fault: {0}")]
    TransientStorage(String),

    /// A transient fault that survived every retry attempt
    #[error("Storage unavailable after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Unique / foreign key / check constraint violations
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),

    /// The caller cancelled the operation before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn conflict(entity: impl Into<String>, id: i32) -> Self {
        DomainError::Conflict {
            entity: entity.into(),
            id,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: i32) -> Self {
        DomainError::NotFound {
            entity: entity.into(),
            id,
        }
    }

    /// Whether a replay of the whole unit of work may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::TransientStorage(_))
    }

    /// Short machine-readable kind, used in API payloads and logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Conflict { .. } => "conflict",
            DomainError::NotFound { .. } => "not_found",
            DomainError::Validation(_) => "validation",
            DomainError::TransientStorage(_) | DomainError::RetriesExhausted { .. } => {
                "unavailable"
            }
            DomainError::Constraint(_) => "constraint",
            DomainError::Cancelled => "cancelled",
            DomainError::Database(_) | DomainError::Internal(_) => "internal",
        }
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            DomainError::Conflict { .. } => {
                "This record was changed by someone else. Refresh and try again.".to_string()
            }
            DomainError::NotFound { .. } => "This record no longer exists.".to_string(),
            DomainError::Validation(msg) => msg.clone(),
            DomainError::TransientStorage(_) | DomainError::RetriesExhausted { .. } => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            DomainError::Constraint(_) => {
                "The change conflicts with existing data and was rejected.".to_string()
            }
            DomainError::Cancelled => "The request was cancelled.".to_string(),
            DomainError::Database(_) | DomainError::Internal(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| SQLITE_RETRYABLE_CODES.contains(&&*code)),
        _ => false,
    }
}

fn is_transient_runtime(err: &RuntimeErr) -> bool {
    match err {
        RuntimeErr::SqlxError(e) => is_transient_sqlx(e),
        RuntimeErr::Internal(_) => false,
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        if let Some(sql_err) = e.sql_err() {
            return match sql_err {
                SqlErr::UniqueConstraintViolation(msg) => DomainError::Constraint(msg),
                SqlErr::ForeignKeyConstraintViolation(msg) => DomainError::Constraint(msg),
                other => DomainError::Database(format!("{:?}", other)),
            };
        }

        let transient = match &e {
            DbErr::ConnectionAcquire(_) => true,
            DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime) => {
                is_transient_runtime(runtime)
            }
            _ => false,
        };

        if transient {
            DomainError::TransientStorage(e.to_string())
        } else {
            DomainError::Database(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: DomainError = DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut)).into();
        assert!(err.is_transient());
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn test_logical_rejections_are_not_transient() {
        assert!(!DomainError::conflict("products", 1).is_transient());
        assert!(!DomainError::not_found("products", 1).is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
        assert!(!DomainError::Constraint("unique".into()).is_transient());

        let err: DomainError = DbErr::Custom("boom".into()).into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_conflict_and_not_found_messages_differ() {
        let conflict = DomainError::conflict("products", 7).user_message();
        let missing = DomainError::not_found("products", 7).user_message();
        let exhausted = DomainError::RetriesExhausted {
            attempts: 5,
            last_error: "database is locked".into(),
        }
        .user_message();

        assert_ne!(conflict, missing);
        assert!(conflict.contains("try again"));
        assert!(exhausted.contains("try again later"));
    }
}
