// ABOUTME: Per-service locks so two redeploys of one service never interleave.
// ABOUTME: Different services proceed concurrently.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::ServiceName;

/// Keyed mutual exclusion over service names.
#[derive(Debug, Default)]
pub struct ServiceLocks {
    locks: Mutex<HashMap<ServiceName, Arc<AsyncMutex<()>>>>,
}

/// Held while a service is being reconciled; releases on drop.
#[derive(Debug)]
pub struct ServiceGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ServiceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `service`.
    pub async fn lock(&self, service: &ServiceName) -> ServiceGuard {
        // The map lock is released before awaiting the service lock.
        let lock = Arc::clone(self.locks.lock().entry(service.clone()).or_default());
        ServiceGuard {
            _guard: lock.lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_service_waits() {
        let locks = Arc::new(ServiceLocks::new());
        let web = ServiceName::new("web").unwrap();

        let held = locks.lock(&web).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let web = web.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&web).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should acquire the released lock")
            .unwrap();
    }

    #[tokio::test]
    async fn different_services_do_not_block() {
        let locks = ServiceLocks::new();
        let _web = locks.lock(&ServiceName::new("web").unwrap()).await;
        let worker = tokio::time::timeout(
            Duration::from_secs(1),
            locks.lock(&ServiceName::new("worker").unwrap()),
        )
        .await;
        assert!(worker.is_ok());
    }
}
