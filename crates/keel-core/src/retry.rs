//! Retry with exponential backoff for throttled remote calls.
//!
//! Only error codes listed in [`RetryConfig::retryable_codes`] are retried.
//! Everything else is returned on the first failure. When the attempt budget
//! runs out the last throttling error is returned and the caller treats it as
//! terminal.

use crate::config::RetryConfig;
use crate::error::{ErrorClass, RemoteError};
use std::future::Future;

/// Classifies remote errors and retries throttled calls.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(RetryConfig::no_retry())
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether the error is a throttling condition under this policy.
    pub fn is_retryable(&self, error: &RemoteError) -> bool {
        self.config
            .retryable_codes
            .iter()
            .any(|code| code == &error.code)
    }

    /// Classify an error, treating this policy's retryable codes as throttling.
    pub fn classify(&self, error: &RemoteError) -> ErrorClass {
        if self.is_retryable(error) {
            ErrorClass::Throttled
        } else {
            error.class()
        }
    }

    /// Run `operation`, retrying throttled failures with backoff.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if !self.is_retryable(&error) => return Err(error),
                Err(error) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        tracing::warn!(
                            operation,
                            attempts = attempt,
                            code = %error.code,
                            "Throttling retry budget exhausted"
                        );
                        return Err(error);
                    }

                    let delay = self.config.delay_for_attempt(attempt - 1);
                    tracing::debug!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        code = %error.code,
                        "Throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
