//! Per-service serialization of mutating operations.
//!
//! Coordinator instances are per-operation, but the single-active-version
//! invariant spans a whole service. All mutating operations for one
//! service take its guard first; the registry's compare-and-swap is the
//! second line of defense against out-of-process writers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per service id, created on first use.
#[derive(Clone, Default)]
pub struct ServiceGuards {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ServiceGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for a service, waiting behind any operation that
    /// already holds it.
    pub async fn lock(&self, service_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(service_id.to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_service_operations_are_serialized() {
        let guards = ServiceGuards::new();
        let running = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let guards = guards.clone();
            let running = running.clone();
            handles.push(tokio::spawn(async move {
                let _guard = guards.lock("svc1").await;
                let concurrent = running.fetch_add(1, Ordering::SeqCst) + 1;
                assert_eq!(concurrent, 1, "two operations held the same guard");
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn different_services_do_not_block_each_other() {
        let guards = ServiceGuards::new();
        let _a = guards.lock("svc1").await;
        // Would deadlock if guards were global.
        let _b = guards.lock("svc2").await;
    }
}
