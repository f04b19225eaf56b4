//! Per-step timeout and retry
//!
//! Every attempt races the step against [`RetryPolicy::step_timeout`]. A
//! retryable step gets up to [`RetryPolicy::max_attempts`] attempts with
//! exponential backoff between them; any other step gets exactly one.

use crate::config::ExportConfig;
use crate::core::export::context::ExportContext;
use crate::core::strategy::ExportStep;
use crate::domain::StepError;
use crate::log_retry_attempt;
use std::time::Duration;

/// Default attempt limit for retryable steps
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff base; the delay after attempt n is `base * 2^(n-1)`
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Default per-attempt deadline
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout and retry settings applied to every step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub step_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Policy from the `[export]` configuration section
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base: Duration::from_secs(config.backoff_base_seconds),
            step_timeout: Duration::from_secs(config.step_timeout_seconds),
        }
    }

    /// Sleep between attempt `attempt` (1-based) and the next one
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Attempts allowed for a step
    pub fn attempts_for(&self, step: &dyn ExportStep) -> u32 {
        if step.retryable() {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// Runs a single step under the retry policy
#[derive(Debug, Clone, Copy, Default)]
pub struct StepExecutor {
    policy: RetryPolicy,
}

impl StepExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `step`, returning the number of attempts it took
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once attempts are exhausted.
    pub async fn run(
        &self,
        step: &dyn ExportStep,
        ctx: &mut ExportContext,
    ) -> std::result::Result<u32, StepError> {
        let max_attempts = self.policy.attempts_for(step);
        let mut attempt = 1;

        loop {
            let error = match tokio::time::timeout(self.policy.step_timeout, step.execute(ctx)).await
            {
                Ok(Ok(())) => return Ok(attempt),
                Ok(Err(e)) => StepError::failed(step.name(), e.to_string()),
                Err(_) => StepError::Timeout {
                    step: step.name().to_string(),
                    timeout: self.policy.step_timeout,
                },
            };

            if attempt >= max_attempts {
                tracing::error!(
                    job_id = %ctx.job_id,
                    step = step.name(),
                    attempts = attempt,
                    error = %error,
                    "Export step failed"
                );
                return Err(error);
            }

            let delay = self.policy.backoff_for(attempt);
            log_retry_attempt!(ctx.job_id, step.name(), attempt + 1, max_attempts, delay, error);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
