//! Retry with exponential backoff for weather requests.
//!
//! Retried: timeouts, connection failures, 5xx, 408 and 429.
//! Not retried: not-found, bad credentials, parse failures.

use std::future::Future;
use std::time::Duration;

use crate::types::WeatherError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, WeatherError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WeatherError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Weather request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Retryable weather error on attempt {} of {}: {} (waiting {:?})",
                    attempt + 1,
                    config.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!("All {} weather attempts failed", attempt + 1);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.initial_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new(5, 100, 500);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3, 1, 1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(WeatherError::Server { status: 502 })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryConfig::new(3, 1, 1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(WeatherError::NotFound("Atlantis".into())) }
        })
        .await;

        assert!(matches!(result, Err(WeatherError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryConfig::new(2, 1, 1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(WeatherError::Server { status: 500 }) }
        })
        .await;

        assert!(matches!(result, Err(WeatherError::Server { status: 500 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
