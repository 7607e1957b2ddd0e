//! Retry with exponential backoff for the log upload.

use crate::core::error::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time::sleep;

/// Backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Spread delays by up to 25%.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Short delays, for tests and interactive use.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Schedule used for the log upload.
    pub fn upload() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            Duration::from_secs_f64(secs * (1.0 + 0.25 * jitter_fraction()))
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Cheap jitter in `[0, 1)` from the clock's sub-second nanoseconds.
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Errors that may succeed when the operation is repeated.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_timeout()
            || self.is_connect()
            || self
                .status()
                .is_some_and(|s| s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// A permanent failure becomes [`Error::Upload`]; running out of attempts
/// becomes [`Error::NetworkRetryExhausted`].
pub async fn retry_async<T, E, F, Fut>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display + Retryable,
{
    let start = Instant::now();
    let mut last_error = String::new();

    for attempt in 1..=config.max_attempts {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!(
                        "{} succeeded on attempt {} after {:?}",
                        operation_name,
                        attempt,
                        start.elapsed()
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        last_error = err.to_string();
        if !err.is_retryable() {
            log::debug!("{} failed permanently: {}", operation_name, err);
            return Err(Error::Upload(format!("{}: {}", operation_name, err)));
        }
        if attempt == config.max_attempts {
            break;
        }

        let delay = config.delay_for_attempt(attempt);
        log::debug!(
            "{} failed (attempt {}/{}), retrying in {:?}: {}",
            operation_name,
            attempt,
            config.max_attempts,
            delay,
            err
        );
        sleep(delay).await;
    }

    log::warn!(
        "{} failed after {} attempts: {}",
        operation_name,
        config.max_attempts,
        last_error
    );
    Err(Error::network_retry_exhausted(
        operation_name,
        config.max_attempts,
        last_error,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Flaky {
        transient: bool,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (transient: {})", self.transient)
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.transient
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            add_jitter: false,
            ..RetryConfig::quick()
        }
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: false,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::quick();
        let delay = config.delay_for_attempt(1);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(125));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let mut attempts = 0;
        let result = retry_async("upload", &fast(), || {
            attempts += 1;
            let outcome = if attempts < 3 { Err(Flaky { transient: true }) } else { Ok(attempts) };
            async move { outcome }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let mut attempts = 0;
        let result: Result<()> = retry_async("upload", &fast().with_max_attempts(2), || {
            attempts += 1;
            async { Err(Flaky { transient: true }) }
        })
        .await;

        assert_eq!(attempts, 2);
        assert!(matches!(
            result,
            Err(Error::NetworkRetryExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let mut attempts = 0;
        let result: Result<()> = retry_async("upload", &fast(), || {
            attempts += 1;
            async { Err(Flaky { transient: false }) }
        })
        .await;

        assert_eq!(attempts, 1);
        assert!(matches!(result, Err(Error::Upload(_))));
    }
}
