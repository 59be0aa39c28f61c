//! Exponential-backoff poller for eventually consistent reads.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use tfokta_core::{CallContext, OktaError, OktaResult};

/// Outcome of one failed poll attempt.
#[derive(Debug)]
pub enum PollError {
    /// The condition does not hold yet.
    Pending(String),
    /// A retryable failure; polling continues.
    Transient(OktaError),
    /// Stop polling and surface the error.
    Permanent(OktaError),
}

impl PollError {
    /// Sort an API error into transient or permanent.
    ///
    /// `NotFound` is transient here: a freshly created object may not be
    /// visible to reads yet.
    pub fn classify(error: OktaError) -> Self {
        match error {
            OktaError::Cancelled | OktaError::Timeout { .. } => PollError::Permanent(error),
            e if e.is_transient() || e.is_not_found() => PollError::Transient(e),
            e => PollError::Permanent(e),
        }
    }

    fn describe(&self) -> String {
        match self {
            PollError::Pending(reason) => reason.clone(),
            PollError::Transient(e) | PollError::Permanent(e) => e.to_string(),
        }
    }
}

impl From<OktaError> for PollError {
    fn from(error: OktaError) -> Self {
        PollError::classify(error)
    }
}

/// Poll schedule.
#[derive(Debug, Clone)]
pub struct Poller {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Polling gives up once this much time has passed.
    pub max_elapsed: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl Poller {
    pub fn new(initial_interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            initial_interval,
            max_elapsed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Interval before attempt `attempt + 1`.
    pub fn interval(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(31) as i32);
        self.initial_interval
            .mul_f64(factor)
            .min(self.max_interval.max(self.initial_interval))
    }

    /// Call `f` until it succeeds, fails permanently or `max_elapsed` passes.
    pub async fn run<F, Fut, T>(&self, ctx: &CallContext, what: &str, mut f: F) -> OktaResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PollError>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            ctx.check()?;
            let last = match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(what, attempts = attempt + 1, "Condition reached");
                    }
                    return Ok(value);
                }
                Err(PollError::Permanent(error)) => return Err(error),
                Err(other) => other,
            };

            let elapsed = started.elapsed();
            let delay = self.interval(attempt);
            if elapsed + delay > self.max_elapsed {
                warn!(what, attempts = attempt + 1, elapsed_ms = elapsed.as_millis() as u64, "Gave up polling");
                return Err(OktaError::fatal(format!(
                    "{what} did not converge within {:?}: {}",
                    self.max_elapsed,
                    last.describe()
                )));
            }

            debug!(what, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, reason = %last.describe(), "Not converged yet");
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_interval_grows_and_caps() {
        let poller = Poller::new(Duration::from_millis(100), Duration::from_secs(5))
            .max_interval(Duration::from_millis(350));
        assert_eq!(poller.interval(0), Duration::from_millis(100));
        assert_eq!(poller.interval(1), Duration::from_millis(200));
        assert_eq!(poller.interval(2), Duration::from_millis(350));
        assert_eq!(poller.interval(20), Duration::from_millis(350));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            PollError::classify(OktaError::not_found("missing")),
            PollError::Transient(_)
        ));
        assert!(matches!(
            PollError::classify(OktaError::invalid_input("bad")),
            PollError::Permanent(_)
        ));
        assert!(matches!(
            PollError::classify(OktaError::Cancelled),
            PollError::Permanent(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_condition_holds() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = Poller::new(Duration::from_millis(100), Duration::from_secs(10));

        let counter = Arc::clone(&calls);
        let value = poller
            .run(&CallContext::new(), "membership", move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        Err(PollError::Pending(format!("{n} of 3 visible")))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = Poller::default();

        let counter = Arc::clone(&calls);
        let err = poller
            .run(&CallContext::new(), "scope", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(PollError::Permanent(OktaError::invalid_input("bad")))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_elapsed() {
        let poller = Poller::new(Duration::from_millis(100), Duration::from_secs(1));
        let err = poller
            .run(&CallContext::new(), "scope", || async {
                Err::<(), _>(PollError::Transient(OktaError::not_found("not yet")))
            })
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "FATAL");
        assert!(err.to_string().contains("did not converge"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_observed() {
        let ctx = CallContext::new();
        ctx.cancel();
        let err = Poller::default()
            .run(&ctx, "scope", || async { Ok::<_, PollError>(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, OktaError::Cancelled));
    }
}
