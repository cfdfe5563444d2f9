//! Bounded retry with fixed or exponential delay.

use std::future::Future;
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub delay: Duration,
    /// Multiplier applied to the delay after each further failure.
    /// `1.0` keeps the delay fixed.
    pub backoff: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    /// Retries with the same delay every time.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: 1.0,
            max_delay: delay,
        }
    }

    /// Retries with a delay that grows by `backoff` each time, capped at `max_delay`.
    pub fn exponential(max_attempts: u32, delay: Duration, backoff: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: backoff.max(1.0),
            max_delay: max_delay.max(delay),
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        if self.backoff <= 1.0 {
            return self.delay;
        }
        let exponent = failed_attempt.saturating_sub(1).min(64) as i32;
        let factor = self.backoff.powi(exponent);
        let scaled = self.delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Worst-case time spent sleeping before giving up.
    pub fn max_total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Runs `op` until it succeeds or the policy's attempts are exhausted.
///
/// The error of the last attempt is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %e,
                    "retries exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                metrics::counter!("audit_retries_total", "operation" => operation.to_string())
                    .increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_default_matches_store_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.delay_for(7), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::exponential(
            10,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(500),
        );
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(60), Duration::from_millis(500));
    }

    #[test]
    fn test_max_total_delay() {
        let policy = RetryPolicy::fixed(4, Duration::from_millis(10));
        assert_eq!(policy.max_total_delay(), Duration::from_millis(30));
        assert_eq!(RetryPolicy::no_retry().max_total_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let result: Result<u32, String> = with_retry(&policy, "test", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result: Result<(), String> = with_retry(&policy, "test", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("fail {n}"))
        })
        .await;

        assert_eq!(result, Err("fail 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_runs_once() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), &str> = with_retry(&RetryPolicy::no_retry(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("nope")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
