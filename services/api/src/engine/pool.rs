//! services/api/src/engine/pool.rs
//!
//! Bounded worker pools for background generation and persistence jobs.
//!
//! A pool caps in-flight jobs with a semaphore and bounds its pending
//! queue explicitly: `capacity + queue_capacity` submissions may be
//! outstanding at once, and the configured backpressure policy decides
//! whether an excess submission waits or fails fast. There is no
//! priority, no cancellation, and no retry; a failed job logs and
//! terminates, and its failure is visible only if the caller joins it.

use crate::config::BackpressurePolicy;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::error;
use tutor_core::ports::{PortError, PortResult};

/// A bounded pool of background jobs.
#[derive(Clone)]
pub struct TaskPool {
    name: &'static str,
    /// One permit per outstanding submission (running or queued).
    slots: Arc<Semaphore>,
    /// One permit per running job.
    workers: Arc<Semaphore>,
    policy: BackpressurePolicy,
}

impl TaskPool {
    pub fn new(
        name: &'static str,
        capacity: usize,
        queue_capacity: usize,
        policy: BackpressurePolicy,
    ) -> Self {
        Self {
            name,
            slots: Arc::new(Semaphore::new(capacity + queue_capacity)),
            workers: Arc::new(Semaphore::new(capacity)),
            policy,
        }
    }

    /// Submits a job. Join the returned handle for fork-join semantics, or
    /// drop it for fire-and-forget jobs whose side effects are the only
    /// observable outcome.
    pub async fn submit<F, T>(&self, job: F) -> PortResult<JoinHandle<PortResult<T>>>
    where
        F: Future<Output = PortResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let slot = match self.policy {
            BackpressurePolicy::Block => Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
            BackpressurePolicy::Reject => {
                Arc::clone(&self.slots).try_acquire_owned().map_err(|_| {
                    PortError::PoolSaturated(format!("{} pool is at capacity", self.name))
                })?
            }
        };

        let workers = Arc::clone(&self.workers);
        let name = self.name;

        Ok(tokio::spawn(async move {
            let _slot = slot;
            let _worker = workers
                .acquire_owned()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            let result = job.await;
            if let Err(e) = &result {
                error!("{} pool job failed: {}", name, e);
            }
            result
        }))
    }

    /// Fork-join: wait for a submitted job and surface its result.
    pub async fn join<T>(handle: JoinHandle<PortResult<T>>) -> PortResult<T> {
        handle
            .await
            .map_err(|e| PortError::Unexpected(format!("background job panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pool(capacity: usize, queue: usize, policy: BackpressurePolicy) -> TaskPool {
        TaskPool::new("test", capacity, queue, policy)
    }

    #[tokio::test]
    async fn fork_join_returns_the_job_result() {
        let p = pool(2, 2, BackpressurePolicy::Block);
        let handle = p.submit(async { Ok::<_, PortError>(21 * 2) }).await.unwrap();
        assert_eq!(TaskPool::join(handle).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn a_failed_job_is_visible_only_when_joined() {
        let p = pool(2, 2, BackpressurePolicy::Block);
        let handle = p
            .submit(async { Err::<(), _>(PortError::Unexpected("boom".into())) })
            .await
            .unwrap();
        assert!(TaskPool::join(handle).await.is_err());

        // Fire-and-forget: dropping the handle must not disturb the pool.
        let dropped = p
            .submit(async { Err::<(), _>(PortError::Unexpected("ignored".into())) })
            .await
            .unwrap();
        drop(dropped);
        let ok = p.submit(async { Ok::<_, PortError>(1) }).await.unwrap();
        assert_eq!(TaskPool::join(ok).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reject_policy_fails_fast_when_saturated() {
        let p = pool(1, 0, BackpressurePolicy::Reject);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let running = p
            .submit(async move {
                let _ = release_rx.await;
                Ok::<_, PortError>(())
            })
            .await
            .unwrap();

        // Give the spawned job a moment to occupy the single slot.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = p.submit(async { Ok::<_, PortError>(()) }).await.unwrap_err();
        assert!(matches!(err, PortError::PoolSaturated(_)));

        release_tx.send(()).unwrap();
        TaskPool::join(running).await.unwrap();

        // The freed slot accepts work again.
        let after = p.submit(async { Ok::<_, PortError>(()) }).await.unwrap();
        TaskPool::join(after).await.unwrap();
    }

    #[tokio::test]
    async fn capacity_caps_concurrent_execution() {
        let p = pool(2, 8, BackpressurePolicy::Block);
        let peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let peak = peak.clone();
            let current = current.clone();
            let handle = p
                .submit(async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, PortError>(())
                })
                .await
                .unwrap();
            handles.push(handle);
        }

        for handle in handles {
            TaskPool::join(handle).await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
