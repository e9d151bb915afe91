//! Retry with exponential backoff for calls to external systems
//!
//! Only [`ErrorCategory::TransientInfrastructure`] failures are retried.
//! Everything else is returned on first sight.
//!
//! [`ErrorCategory::TransientInfrastructure`]: super::ErrorCategory::TransientInfrastructure

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::VaultError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt, doubling after that
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// No delays, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `f` until it succeeds, fails with a non-transient error, or the policy
///  runs out of attempts.
pub(crate) async fn retry_transient<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut f: F,
) -> Result<T, VaultError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<VaultError>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match f().await {
            Ok(value) => return Ok(value),
            Err(e) => e.into(),
        };
        if !error.is_transient() {
            return Err(error);
        }
        if attempt >= attempts {
            return Err(VaultError::Transient {
                operation,
                attempts: attempt,
                reason: error.to_string(),
            });
        }

        let delay = policy.delay(attempt);
        tracing::warn!(
            operation,
            attempt,
            max_attempts = attempts,
            "{} failed, retrying in {:?}: {}",
            operation,
            delay,
            error
        );
        tokio::time::sleep(delay).await;
    }
}
