//! Optimistic concurrency, soft delete and audit core
//!
//! - `tracked`: bridge from SeaORM models to the capability contracts
//! - `registry`: entity registry and default-scope filters
//! - `concurrency`: early version check and conditional writes
//! - `interceptor`: audit stamping and soft-delete rewriting
//! - `unit_of_work`: batched, transactional mutations
//! - `retry`: backoff policy and cancellation
//! - `store`: the entry point repositories use

pub mod concurrency;
pub mod interceptor;
pub mod query;
pub mod registry;
pub mod retry;
pub mod store;
pub mod tracked;
pub mod unit_of_work;

pub use concurrency::ensure_expected_version;
pub use interceptor::{InterceptSummary, MutationInterceptor};
pub use query::ReadScope;
pub use registry::{EntityDescriptor, EntityRegistry, EntityRegistryBuilder};
pub use retry::{CancelSignal, CancelSource, RetryPolicy};
pub use store::EntityStore;
pub use tracked::{TrackedModel, column, entity_name};
pub use unit_of_work::{EntryHandle, EntryState, UnitOfWork};
