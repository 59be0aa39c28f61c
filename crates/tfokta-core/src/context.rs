//! Per-call cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{OktaError, OktaResult};

/// Cancellation and deadline shared by every suspension point of a CRUD call.
///
/// Cloning shares the same token; use [`CallContext::child`] to derive a
/// context that can be cancelled independently of its parent.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    started: Instant,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Context without a deadline.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            started: Instant::now(),
        }
    }

    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Replace the deadline, keeping the earlier of the two.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derived context, cancelled with its parent.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            started: Instant::now(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail if cancelled or past the deadline.
    pub fn check(&self) -> OktaResult<()> {
        if self.cancel.is_cancelled() {
            return Err(OktaError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(self.timeout_error());
            }
        }
        Ok(())
    }

    /// Sleep, waking early on cancellation or deadline.
    ///
    /// Returns `Timeout` without sleeping when the deadline falls before the
    /// end of the sleep.
    pub async fn sleep(&self, duration: Duration) -> OktaResult<()> {
        self.check()?;
        if duration.is_zero() {
            return Ok(());
        }
        let wake = Instant::now() + duration;
        if let Some(deadline) = self.deadline {
            if wake > deadline {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(OktaError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => return Err(self.timeout_error()),
                }
            }
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(OktaError::Cancelled),
            _ = tokio::time::sleep_until(wake) => Ok(()),
        }
    }

    /// Run a future under this context.
    pub async fn run<F, T>(&self, fut: F) -> OktaResult<T>
    where
        F: Future<Output = OktaResult<T>>,
    {
        self.check()?;
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(OktaError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => Err(self.timeout_error()),
                    result = fut => result,
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(OktaError::Cancelled),
                    result = fut => result,
                }
            }
        }
    }

    fn timeout_error(&self) -> OktaError {
        OktaError::Timeout {
            elapsed: self.started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_cancelled() {
        let ctx = CallContext::new();
        assert!(ctx.check().is_ok());
        ctx.cancel();
        assert!(matches!(ctx.check(), Err(OktaError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = CallContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());

        let parent = CallContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_hits_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_secs(1));
        let err = ctx.sleep(Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(err.error_code(), "TIMEOUT");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let ctx = CallContext::with_timeout(Duration::from_secs(10));
        ctx.sleep(Duration::from_secs(1)).await.unwrap();
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_sleep_cancelled() {
        let ctx = CallContext::new();
        let handle = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.sleep(Duration::from_secs(60)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(OktaError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let result: OktaResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(OktaError::Timeout { .. })));
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(50));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }
}
