//! Bounded concurrency over a list of async jobs.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

/// Runs at most `limit` futures at once; results keep input order.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    limit: usize,
    permits: Arc<Semaphore>,
}

impl BoundedPool {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run<T, F, Fut, R>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let jobs = items.into_iter().map(|item| {
            let permits = Arc::clone(&self.permits);
            let job = f(item);
            async move {
                // The semaphore is never closed, so a permit always arrives.
                let _permit = permits.acquire_owned().await.ok();
                job.await
            }
        });
        join_all(jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_limit() {
        let pool = BoundedPool::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = pool
            .run((0..12).collect(), |i: usize| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    i * 2
                }
            })
            .await;

        assert_eq!(out, (0..12).map(|i| i * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn zero_limit_means_one() {
        assert_eq!(BoundedPool::new(0).limit(), 1);
    }
}
