//! Retry policy and cancellation for units of work
//!
//! A conditional write wrapped in begin → mutate → commit cannot be retried at
//! the statement level, so the policy here decides whether a *whole* unit of
//! work is replayed. See `EntityStore::execute_with_retry`.

use std::time::Duration;

use tokio::sync::watch;

use crate::domain::DomainError;

// ============================================================================
// Retry Configuration
// ============================================================================

/// Bounded exponential backoff for transient storage faults
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::new()
///     .with_max_attempts(3)
///     .with_base_delay(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles afterwards
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that gives up on the first transient fault
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Cap the shift so 1 << shift stays within u32
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Decide what happens after attempt number `attempt` failed with `error`.
    ///
    /// Returns `Ok(())` once the backoff delay has elapsed and another attempt
    /// should run. Non-transient errors come straight back; a transient error
    /// on the last attempt becomes `RetriesExhausted`.
    pub(crate) async fn backoff(
        &self,
        attempt: u32,
        error: DomainError,
        cancel: &CancelSignal,
    ) -> Result<(), DomainError> {
        if !error.is_transient() {
            return Err(error);
        }

        if attempt >= self.attempts() {
            tracing::error!(
                "Giving up after {} attempts, last transient fault: {}",
                attempt,
                error
            );
            return Err(DomainError::RetriesExhausted {
                attempts: attempt,
                last_error: error.to_string(),
            });
        }

        let delay = self.delay_for(attempt);
        tracing::warn!(
            "Attempt {}/{} hit a transient fault ({}); retrying in {:?}",
            attempt,
            self.attempts(),
            error,
            delay
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => {
                tracing::info!("Retry cancelled before attempt {}", attempt + 1);
                Err(DomainError::Cancelled)
            }
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Owner side of a cancellation signal
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation signal accepted by every asynchronous store operation
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// Signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending::<()>().await;
        };

        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // Source dropped without cancelling
            if rx.changed().await.is_err() {
                return std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let policy = RetryPolicy::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30));

        // 1, 2, 4, 8, 16, 30 (capped), 30
        let delays: Vec<u64> = (1..=7).map(|a| policy.delay_for(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);

        // Huge attempt numbers must not overflow
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_no_retry_still_allows_one_attempt() {
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
        assert_eq!(RetryPolicy::new().with_max_attempts(0).attempts(), 1);
    }

    #[tokio::test]
    async fn test_backoff_passes_through_logical_errors() {
        let policy = RetryPolicy::new().with_base_delay(Duration::from_millis(1));
        let err = policy
            .backoff(1, DomainError::conflict("products", 1), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_backoff_exhausts_on_last_attempt() {
        let policy = RetryPolicy::new().with_max_attempts(2);
        let err = policy
            .backoff(
                2,
                DomainError::TransientStorage("database is locked".into()),
                &CancelSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::RetriesExhausted { attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_backoff_aborts_when_cancelled() {
        let policy = RetryPolicy::new().with_base_delay(Duration::from_secs(60));
        let source = CancelSource::new();
        let signal = source.signal();
        source.cancel();

        let err = policy
            .backoff(
                1,
                DomainError::TransientStorage("timeout".into()),
                &signal,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_never_signal_is_not_cancelled() {
        assert!(!CancelSignal::never().is_cancelled());
    }
}
