//! Exponential-backoff retry, shared by every stage that talks to an
//! external HTTP collaborator (the Fetcher and the relation-service client).
//!
//! Defaults match §4.1 exactly: 100 ms base delay, x2 multiplier, 5 s cap,
//! +/-25% jitter, 3 retries.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before a given 1-indexed retry attempt; attempt 0 (the first
    /// try) never waits.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let exponential = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                let jitter = nanos % (jitter_range * 2);
                let delayed = delay_ms.saturating_sub(jitter_range) + jitter;
                return Duration::from_millis(delayed);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    pub result: Result<T, String>,
    pub attempts: u32,
    pub total_duration: Duration,
    pub succeeded: bool,
}

impl<T> RetryResult<T> {
    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Classifies a status/error description as retryable per §4.1: timeouts,
/// connection resets, and HTTP 408/429/502/503/504.
pub fn is_retryable_error(error: &str) -> bool {
    let lower = error.to_lowercase();

    if lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("reset")
        || lower.contains("refused")
        || lower.contains("dns")
        || lower.contains("unreachable")
    {
        return true;
    }

    if lower.contains("408")
        || lower.contains("429")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("504")
    {
        return true;
    }

    if lower.contains("400")
        || lower.contains("401")
        || lower.contains("403")
        || lower.contains("404")
        || lower.contains("422")
    {
        return false;
    }

    false
}

/// Runs a blocking operation with retry/backoff.
pub fn execute_with_retry<T, F>(config: &RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut(u32) -> Result<T, String>,
{
    let start = std::time::Instant::now();
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation(attempt) {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                    succeeded: true,
                };
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < config.max_retries {
                    let delay = config.calculate_delay(attempt + 1);
                    if delay > Duration::from_millis(0) {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }

    RetryResult {
        result: Err(last_error.unwrap_or_else(|| "all retries exhausted".to_string())),
        attempts: config.max_retries + 1,
        total_duration: start.elapsed(),
        succeeded: false,
    }
}

/// Runs an async operation with retry/backoff.
#[cfg(feature = "async")]
pub async fn execute_with_retry_async<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let start = std::time::Instant::now();
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                    succeeded: true,
                };
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < config.max_retries {
                    let delay = config.calculate_delay(attempt + 1);
                    if delay > Duration::from_millis(0) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    RetryResult {
        result: Err(last_error.unwrap_or_else(|| "all retries exhausted".to_string())),
        attempts: config.max_retries + 1,
        total_duration: start.elapsed(),
        succeeded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_parameters() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.jitter);
    }

    #[test]
    fn first_attempt_never_waits() {
        let config = RetryConfig::default();
        assert_eq!(config.calculate_delay(0), Duration::from_millis(0));
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let config = RetryConfig::default().with_jitter(false);
        assert_eq!(config.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_secs(1))
            .with_backoff_multiplier(10.0)
            .with_jitter(false);
        assert_eq!(config.calculate_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn retries_until_success() {
        let config = RetryConfig::default().with_base_delay(Duration::from_millis(1));
        let attempts = std::cell::RefCell::new(0);
        let result = execute_with_retry(&config, |_| {
            let mut n = attempts.borrow_mut();
            *n += 1;
            if *n < 3 {
                Err("connection reset".to_string())
            } else {
                Ok("ok")
            }
        });
        assert!(result.succeeded);
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn exhausts_after_max_retries() {
        let config = RetryConfig::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(1));
        let result: RetryResult<()> = execute_with_retry(&config, |_| Err("503".to_string()));
        assert!(!result.succeeded);
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn retryable_classification() {
        assert!(is_retryable_error("request timeout"));
        assert!(is_retryable_error("HTTP 503"));
        assert!(is_retryable_error("429 too many requests"));
        assert!(!is_retryable_error("404 not found"));
        assert!(!is_retryable_error("401 unauthorized"));
    }

    #[tokio::test]
    async fn async_retry_succeeds_eventually() {
        let config = RetryConfig::default().with_base_delay(Duration::from_millis(1));
        let attempts = std::cell::RefCell::new(0);
        let result = execute_with_retry_async(&config, |_| {
            let mut n = attempts.borrow_mut();
            *n += 1;
            let ok = *n >= 2;
            async move {
                if ok {
                    Ok("ok")
                } else {
                    Err("connection reset".to_string())
                }
            }
        })
        .await;
        assert!(result.succeeded);
    }
}
