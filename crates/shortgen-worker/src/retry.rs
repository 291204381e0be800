//! Retry utilities with exponential backoff.
//!
//! Provider calls go to flaky external services; transient failures are
//! retried a bounded number of times, terminal ones are returned at once.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success { value: T, attempts: u32 },
    /// The last error, after retries ran out or the error was terminal.
    Failed { error: E, attempts: u32 },
    /// `should_stop` turned true before the next attempt could start.
    Stopped { attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. }
            | RetryResult::Failed { attempts, .. }
            | RetryResult::Stopped { attempts } => *attempts,
        }
    }
}

/// Execute an async operation, retrying errors for which `should_retry`
/// returns true.
///
/// `should_stop` is checked before every attempt and again before each
/// backoff sleep; once it returns true no further attempt is started.
///
/// ```ignore
/// let config = RetryConfig::new("image_search").with_max_retries(2);
/// let result = retry_async(
///     &config,
///     || provider.generate(&request),
///     |e| e.is_retryable(),
///     || *cancel.borrow(),
/// )
/// .await;
/// ```
pub async fn retry_async<F, Fut, T, E, P, S>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
    should_stop: S,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
    S: Fn() -> bool,
{
    let mut attempts = 0u32;

    loop {
        if should_stop() {
            return RetryResult::Stopped { attempts };
        }
        attempts += 1;

        match operation().await {
            Ok(value) => return RetryResult::Success { value, attempts },
            Err(e) if attempts <= config.max_retries && should_retry(&e) => {
                if should_stop() {
                    debug!("{} stopped after attempt {}: {}", config.operation_name, attempts, e);
                    return RetryResult::Stopped { attempts };
                }
                let delay = config.delay_for_attempt(attempts);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return RetryResult::Failed { error, attempts },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(100));

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_config_max_delay() {
        let config = RetryConfig::new("test")
            .with_base_delay(Duration::from_secs(10))
            .with_max_retries(10);
        assert_eq!(config.delay_for_attempt(8), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_retry_async_immediate_success() {
        let config = RetryConfig::new("test");
        let calls = AtomicU32::new(0);

        let result = retry_async(
            &config,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(42) }
            },
            |_| true,
            || false,
        )
        .await;

        assert_eq!(result.attempts(), 1);
        assert!(matches!(result, RetryResult::Success { value: 42, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_async_eventual_success() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = retry_async(
            &config,
            || {
                let count = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err("transient error")
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| true,
            || false,
        )
        .await;

        assert!(matches!(result, RetryResult::Success { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = retry_async(
            &config,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("content filtered") }
            },
            |e: &&str| !e.contains("filtered"),
            || false,
        )
        .await;

        assert!(matches!(result, RetryResult::Failed { .. }));
        assert_eq!(result.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let config = RetryConfig::new("test")
            .with_base_delay(Duration::from_millis(1))
            .with_max_retries(2);
        let calls = AtomicU32::new(0);

        let result = retry_async(
            &config,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("still down") }
            },
            |_| true,
            || false,
        )
        .await;

        assert_eq!(result.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_prevents_further_attempts() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        // The first attempt fails transiently and raises the stop flag.
        let result = retry_async(
            &config,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("service unavailable") }
            },
            |_| true,
            || calls.load(Ordering::SeqCst) > 0,
        )
        .await;

        assert!(matches!(result, RetryResult::Stopped { attempts: 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stopped_before_first_attempt() {
        let config = RetryConfig::new("test");
        let result = retry_async(&config, || async { Ok::<_, String>(1) }, |_| true, || true).await;

        assert_eq!(result.attempts(), 0);
        assert!(matches!(result, RetryResult::Stopped { .. }));
    }
}
