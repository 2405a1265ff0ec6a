//! Actor and clock supplied to every mutation

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use super::{AuditStamp, DomainError};

/// Source of "now" for audit stamps.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by `step` on every reading.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Clock frozen at `at`.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::new(at, Duration::zero())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = *current;
        *current = now + self.step;
        now
    }
}

/// The actor performing a unit of work and the clock used to stamp it.
#[derive(Clone)]
pub struct AuditContext {
    actor: String,
    clock: Arc<dyn Clock>,
}

impl AuditContext {
    pub fn new(actor: impl Into<String>, clock: Arc<dyn Clock>) -> Result<Self, DomainError> {
        let actor = actor.into();
        if actor.trim().is_empty() {
            return Err(DomainError::Validation(
                "audit actor must not be empty".to_string(),
            ));
        }
        Ok(Self { actor, clock })
    }

    /// Actor stamped with the wall clock.
    pub fn system(actor: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(actor, Arc::new(SystemClock))
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Read the clock once and pair it with the actor.
    pub fn stamp(&self) -> AuditStamp {
        AuditStamp {
            at: self.clock.now(),
            by: self.actor.clone(),
        }
    }
}

impl fmt::Debug for AuditContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditContext")
            .field("actor", &self.actor)
            .field("clock", &self.clock)
            .finish()
    }
}
