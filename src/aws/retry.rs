use std::future::Future;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;

use crate::{OpsworksSshError, Result};

/// Timeout and retry budget for AWS calls.
///
/// Retries are left to the SDK, which only repeats transient failures
/// (throttling, transport errors, 5xx). Auth and validation errors fail on
/// the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            retries: crate::config::DEFAULT_RETRIES,
        }
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::standard().with_max_attempts(self.retries + 1)
    }

    /// Bounds a whole operation, retries included
    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::builder()
            .operation_timeout(self.timeout)
            .build()
    }

    /// Await `call` once, failing with `Timeout` if it outlasts the budget
    pub async fn run<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OpsworksSshError::Timeout(format!(
                "{} after {}s",
                what,
                self.timeout.as_secs()
            ))),
        }
    }
}
