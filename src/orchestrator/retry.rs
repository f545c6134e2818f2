//! Retries of recoverable plugin calls within a scan deadline.

use crate::core::PluginError;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Backoff policy for recoverable plugin errors.
///
/// Only errors for which [`PluginError::is_recoverable`] holds are retried;
/// a plugin that answered with an error or a broken body is not asked
/// again.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Wait before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any single wait.
    pub max_delay: Duration,

    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Wait before retry number `retry` (1 for the first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Runs `operation`, retrying recoverable plugin errors per `config`.
///
/// A retry whose wait would end past `deadline` is not attempted; the last
/// error is returned instead.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    deadline: Instant,
    mut operation: F,
) -> Result<T, PluginError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PluginError>>,
{
    let mut retries = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        retries += 1;
        if !error.is_recoverable() || retries >= config.max_attempts {
            return Err(error);
        }

        let wait = config.backoff(retries);
        let out_of_time = match Instant::now().checked_add(wait) {
            Some(end) => end >= deadline,
            None => true,
        };
        if out_of_time {
            tracing::debug!(error = %error, "No time left to retry plugin call");
            return Err(error);
        }

        tracing::debug!(
            retry = retries,
            max_attempts = config.max_attempts,
            wait = ?wait,
            error = %error,
            "Retrying plugin call"
        );
        tokio::time::sleep(wait).await;
    }
}
