//! Bounded retries for Tinkerbell RPCs.
//!
//! A [`RetryPolicy`] decides which statuses are worth another attempt and how
//! long to wait in between. Two presets cover the service's failure modes:
//! [`RetryPolicy::serialization`] for database serialization conflicts and
//! [`RetryPolicy::transient`] for conflicts plus temporary unavailability.

use std::future::Future;
use std::time::Duration;
use tonic::{Code, Status};

/// Attempts made by the presets, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for the delay between attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);

/// Decides whether a failed attempt should be retried.
pub type Classifier = fn(&Status) -> bool;

/// Retry behaviour for a class of operations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    name: &'static str,
    classify: Classifier,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default bounds.
    pub fn new(name: &'static str, classify: Classifier) -> Self {
        Self {
            name,
            classify,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Retry database serialization conflicts.
    pub fn serialization() -> Self {
        Self::new("serialization", is_serialization_error)
    }

    /// Retry serialization conflicts and temporary unavailability.
    pub fn transient() -> Self {
        Self::new("transient", is_transient_error)
    }

    /// Set the total number of attempts. Values below one are treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the first delay; later delays double up to the current maximum.
    pub fn with_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = self.max_delay.max(initial_delay);
        self
    }

    /// Total number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether this policy retries the given status.
    pub fn should_retry(&self, status: &Status) -> bool {
        (self.classify)(status)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a status this policy does not
    /// retry, or runs out of attempts. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Status>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(status) if attempt < self.max_attempts && self.should_retry(&status) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        policy = self.name,
                        attempt,
                        max_attempts = self.max_attempts,
                        code = ?status.code(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying: {}",
                        status.message()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(status) => return Err(status),
            }
        }
    }
}

/// Whether the status reports a PostgreSQL serialization failure.
pub fn is_serialization_error(status: &Status) -> bool {
    if status.code() == Code::Aborted {
        return true;
    }
    let message = status.message();
    message.contains("40001") || message.contains("could not serialize access")
}

/// Whether the status is worth retrying after a short wait.
pub fn is_transient_error(status: &Status) -> bool {
    matches!(status.code(), Code::Unavailable | Code::ResourceExhausted)
        || is_serialization_error(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn fast(policy: RetryPolicy) -> RetryPolicy {
        policy.with_delay(Duration::ZERO)
    }

    #[test]
    fn test_classifiers() {
        assert!(is_serialization_error(&Status::aborted("conflict")));
        assert!(is_serialization_error(&Status::unknown(
            "ERROR: could not serialize access due to concurrent update (SQLSTATE 40001)"
        )));
        assert!(!is_serialization_error(&Status::unavailable("connection refused")));

        assert!(is_transient_error(&Status::unavailable("connection refused")));
        assert!(is_transient_error(&Status::resource_exhausted("too many requests")));
        assert!(is_transient_error(&Status::aborted("conflict")));
        assert!(!is_transient_error(&Status::deadline_exceeded("slow")));
        assert!(!is_transient_error(&Status::already_exists("duplicate")));
        assert!(!is_transient_error(&Status::invalid_argument("bad")));
    }

    #[test]
    fn test_delay_backoff() {
        let policy = RetryPolicy::transient();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(6), Duration::from_secs(2));
        assert_eq!(policy.delay_for(40), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let calls = AtomicU32::new(0);
        let k = 3;

        let result = fast(RetryPolicy::serialization())
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < k {
                        Err(Status::aborted("serialization conflict"))
                    } else {
                        Ok("created")
                    }
                }
            })
            .await;

        assert_eq!(assert_ok!(result), "created");
        assert_eq!(calls.load(Ordering::SeqCst), k + 1);
    }

    #[test]
    fn test_non_matching_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), Status> = tokio_test::block_on(fast(RetryPolicy::transient()).run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Status::already_exists("workflow exists")) }
        }));

        let status = assert_err!(result);
        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), "workflow exists");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), Status> = fast(RetryPolicy::transient().with_max_attempts(3))
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(Status::unavailable(format!("attempt {}", n + 1))) }
            })
            .await;

        assert_eq!(result.unwrap_err().message(), "attempt 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let calls = AtomicU32::new(0);
        let start = std::time::Instant::now();

        let result = RetryPolicy::transient()
            .with_delay(Duration::from_millis(10))
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Status::unavailable("down"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_ok!(result);
        // 10ms then 20ms
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
