//! Exponential backoff retry policy.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use tfokta_core::config::RetrySettings;
use tfokta_core::{CallContext, OktaError, OktaResult, RetryClass, TransientReason};

/// Jitter as a fraction of the computed delay.
const JITTER_FACTOR: f64 = 0.25;

/// Retry decisions for one client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    settings: RetrySettings,
}

impl RetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub fn max_retries(&self) -> u32 {
        self.settings.max_retries
    }

    /// Whether `error` may be retried after `attempt` retries under `class`.
    pub fn should_retry(&self, attempt: u32, class: RetryClass, error: &OktaError) -> bool {
        if attempt >= self.settings.max_retries {
            return false;
        }
        Self::is_retryable(class, error)
    }

    /// Whether `class` allows retrying `error` at all.
    pub fn is_retryable(class: RetryClass, error: &OktaError) -> bool {
        match error {
            OktaError::Transient {
                reason: TransientReason::Io,
                detail,
                ..
            } => match detail.status {
                Some(status) => class.retries_status(status),
                None => class.retries_io(),
            },
            OktaError::Transient { detail, .. } => {
                detail.status.is_some_and(|s| class.retries_status(s))
            }
            OktaError::RateLimited { .. } => class.retries_status(429),
            OktaError::Conflict { .. } => class.retries_status(409),
            _ => false,
        }
    }

    /// Backoff for the given retry number, within `[min_wait, max_wait]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let min = self.settings.min_wait;
        let max = self.settings.max_wait.max(min);
        if !self.settings.backoff {
            return min;
        }

        let base = min.max(Duration::from_millis(1));
        let exponential = base.saturating_mul(2u32.saturating_pow(attempt.min(31)));
        let capped = exponential.min(max);

        let jittered = if capped.is_zero() {
            capped
        } else {
            let jitter = rand::thread_rng().gen_range(0.0..=JITTER_FACTOR);
            capped.mul_f64(1.0 + jitter)
        };
        jittered.clamp(min, max)
    }

    /// Wait before the next attempt.
    ///
    /// For 429 responses this is the larger of the backoff and the wait the
    /// service demanded, which is not capped by `max_wait`.
    pub fn delay_for(&self, attempt: u32, error: &OktaError) -> Duration {
        let backoff = self.backoff(attempt);
        match error {
            OktaError::RateLimited {
                retry_after: Some(demanded),
                ..
            } => backoff.max(*demanded),
            _ => backoff,
        }
    }

    /// Run `f` until it succeeds, fails permanently, or retries run out.
    pub async fn execute<F, Fut, T>(
        &self,
        ctx: &CallContext,
        operation_name: &str,
        class: RetryClass,
        mut f: F,
    ) -> OktaResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OktaResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            ctx.check()?;
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !Self::is_retryable(class, &error) {
                        return Err(error);
                    }
                    if attempt >= self.settings.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            error = %error,
                            "Max retries exceeded"
                        );
                        return Err(self.exhausted(attempt, error));
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient error"
                    );
                    ctx.sleep(delay).await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Wrap the last transient error once retries are used up.
    pub fn exhausted(&self, retries: u32, last: OktaError) -> OktaError {
        if retries == 0 {
            return last;
        }
        OktaError::RetriesExhausted {
            attempts: retries + 1,
            last: Box::new(last),
        }
    }
}
