//! Domain layer - Pure business abstractions
//!
//! Capability contracts, version tokens, audit context, repository traits and
//! the domain error type. Storage specifics live in the infrastructure layer.

pub mod audit;
pub mod contracts;
pub mod errors;
pub mod repositories;
pub mod version;

pub use audit::{AuditContext, Clock, ManualClock, SystemClock};
pub use contracts::{AuditStamp, Auditable, Capabilities, SoftDeletable, Versioned};
pub use errors::DomainError;
pub use repositories::*;
pub use version::VersionToken;
