//! Retry policy implementation

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Retry configuration for calls against the service
///
/// Attempt `i` (1-based) that fails is followed by a sleep of `base_interval * i²`
/// before the next try. After `max_retries` failed retries the last error is returned.
///
/// # Example
///
/// ```
/// use sws_flow::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::acknowledgement();
///
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(800));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(1800));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt
    pub max_retries: u32,

    /// Backoff base; the delay after attempt `i` is `base_interval * i²`
    #[serde(with = "duration_millis")]
    pub base_interval: Duration,

    /// Jitter factor (0.0-1.0) to add randomness
    ///
    /// Zero by default; quadratic backoff without jitter keeps timings reproducible.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::acknowledgement()
    }
}

impl RetryPolicy {
    /// Quadratic backoff with the given base, 10 retries, no jitter
    pub fn quadratic(base_interval: Duration) -> Self {
        Self {
            max_retries: 10,
            base_interval,
            jitter: 0.0,
        }
    }

    /// Policy for terminal acknowledgements, decision posts and history pagination (200 ms base)
    pub fn acknowledgement() -> Self {
        Self::quadratic(Duration::from_millis(200))
    }

    /// Policy for transient transport failures inside the HTTP layer (100 ms base)
    pub fn transport() -> Self {
        Self::quadratic(Duration::from_millis(100))
    }

    /// Create a policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_interval: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff base
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Set the jitter factor (0.0-1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Total number of calls this policy allows, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after attempt `attempt` (1-based) failed
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = attempt.saturating_mul(attempt);
        let base = self.base_interval.saturating_mul(factor);

        if self.jitter > 0.0 {
            let secs = base.as_secs_f64();
            let jitter_range = secs * self.jitter;
            let offset = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            Duration::from_secs_f64((secs + offset).max(0.0))
        } else {
            base
        }
    }

    /// Run `attempt_fn` until it succeeds or the retries are exhausted
    ///
    /// Every error is treated as retryable. Returns the last error on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, attempt_fn: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_when(operation, |_| true, attempt_fn).await
    }

    /// Run `attempt_fn`, retrying only errors for which `should_retry` returns true
    pub async fn run_when<T, E, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        mut attempt_fn: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt <= self.max_retries && should_retry(&e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_acknowledgement_defaults() {
        let policy = RetryPolicy::acknowledgement();
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.max_attempts(), 11);
        assert_eq!(policy.base_interval, Duration::from_millis(200));
        assert_eq!(policy.jitter, 0.0);
    }

    #[test]
    fn test_quadratic_delays() {
        let policy = RetryPolicy::transport();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(10_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::acknowledgement().with_jitter(0.5);
        for _ in 0..50 {
            let delay = policy.delay_for_attempt(2);
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_jitter_clamped() {
        assert_eq!(RetryPolicy::transport().with_jitter(4.0).jitter, 1.0);
        assert_eq!(RetryPolicy::transport().with_jitter(-1.0).jitter, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::acknowledgement();

        let result: Result<u32, String> = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 10 {
                    Err(format!("failure {n}"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::acknowledgement().with_max_retries(3);

        let result: Result<(), String> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            })
            .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_when_skips_permanent_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::transport();

        let result: Result<(), String> = policy
            .run_when(
                "test",
                |e: &String| e != "permanent",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("permanent".to_string())
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_serialization() {
        let policy = RetryPolicy::transport().with_max_retries(4);

        let json = serde_json::to_string(&policy).unwrap();
        let parsed: RetryPolicy = serde_json::from_str(&json).unwrap();

        assert_eq!(policy, parsed);
    }
}
