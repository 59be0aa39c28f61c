//! Named locks for endpoints that drop concurrent writes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use tfokta_core::{CallContext, OktaResult};

/// Serializes linked-object definition writes.
pub const LINKED_OBJECT_LOCK: &str = "linked-object-definitions";
/// Serializes default policy discovery.
pub const DEFAULT_DISCOVERY_LOCK: &str = "default-access-policy-discovery";

/// Registry of async mutexes keyed by name, created on first use.
#[derive(Debug, Default)]
pub struct NamedLockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NamedLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock called `name`.
    ///
    /// Gives up with `Cancelled` or `Timeout` when `ctx` ends first.
    pub async fn acquire(&self, ctx: &CallContext, name: &str) -> OktaResult<NamedLockGuard> {
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = ctx.run(async move { Ok(mutex.lock_owned().await) }).await?;
        debug!(lock = name, "Acquired named lock");
        Ok(NamedLockGuard {
            name: name.to_string(),
            _guard: guard,
        })
    }

    /// Names of every lock created so far.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Holds a named lock until dropped.
#[derive(Debug)]
pub struct NamedLockGuard {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        debug!(lock = %self.name, "Released named lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tfokta_core::OktaError;

    #[tokio::test]
    async fn test_same_name_serializes() {
        let registry = Arc::new(NamedLockRegistry::new());
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = registry
                        .acquire(&CallContext::new(), LINKED_OBJECT_LOCK)
                        .await
                        .unwrap();
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(registry.names(), vec![LINKED_OBJECT_LOCK.to_string()]);
    }

    #[tokio::test]
    async fn test_different_names_independent() {
        let registry = NamedLockRegistry::new();
        let ctx = CallContext::new();
        let first = registry.acquire(&ctx, "a").await.unwrap();
        let second = registry.acquire(&ctx, "b").await.unwrap();
        assert_eq!(first.name(), "a");
        assert_eq!(second.name(), "b");
    }

    #[tokio::test]
    async fn test_acquire_respects_deadline() {
        let registry = NamedLockRegistry::new();
        let _held = registry.acquire(&CallContext::new(), "busy").await.unwrap();

        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let err = registry.acquire(&ctx, "busy").await.unwrap_err();
        assert!(matches!(err, OktaError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_acquire_respects_cancellation() {
        let registry = NamedLockRegistry::new();
        let _held = registry.acquire(&CallContext::new(), "busy").await.unwrap();

        let ctx = CallContext::new();
        ctx.cancel();
        let err = registry.acquire(&ctx, "busy").await.unwrap_err();
        assert!(matches!(err, OktaError::Cancelled));
    }
}
