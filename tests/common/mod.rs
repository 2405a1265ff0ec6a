#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use storekeep::db;
use storekeep::domain::{AuditContext, Clock, ManualClock};
use storekeep::persistence::{EntityRegistry, EntityStore, RetryPolicy};

/// Retry policy with millisecond delays so retry tests stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_base_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
}

pub async fn setup_store() -> EntityStore {
    setup_store_with(fast_retry()).await
}

pub async fn setup_store_with(retry: RetryPolicy) -> EntityStore {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let registry = Arc::new(EntityRegistry::bootstrap().expect("Failed to build registry"));
    EntityStore::new(db, registry, retry)
}

/// Clock starting at 2024-03-01 09:00 UTC, one second per reading
pub fn test_clock() -> Arc<ManualClock> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Arc::new(ManualClock::new(start, chrono::Duration::seconds(1)))
}

pub fn audit_with(actor: &str, clock: &Arc<ManualClock>) -> AuditContext {
    let clock: Arc<dyn Clock> = clock.clone();
    AuditContext::new(actor, clock).expect("valid actor")
}

pub fn audit(actor: &str) -> AuditContext {
    audit_with(actor, &test_clock())
}
