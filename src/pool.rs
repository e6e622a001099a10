//! Bounded worker pool for per-unit stages
//!
//! Jobs run on tokio's blocking threads; a semaphore caps how many run at
//! once and results come back in input order.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::BuildError;

/// Fan-out/fan-in pool sized to a fixed number of jobs
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    jobs: usize,
}

impl WorkerPool {
    /// Create a pool running at most `jobs` tasks at a time (at least one)
    pub fn new(jobs: usize) -> Self {
        let jobs = jobs.max(1);
        Self {
            permits: Arc::new(Semaphore::new(jobs)),
            jobs,
        }
    }

    /// Maximum number of jobs running at once
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Apply `f` to every item and collect the results in input order
    ///
    /// A panicking job fails the whole batch with `BuildError::Worker`.
    pub async fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, BuildError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let count = items.len();
        let mut set = JoinSet::new();

        for (position, item) in items.into_iter().enumerate() {
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| BuildError::Worker(e.to_string()))?;
            let f = Arc::clone(&f);

            set.spawn_blocking(move || {
                let result = f(item);
                drop(permit);
                (position, result)
            });
        }

        let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (position, result) = joined.map_err(|e| BuildError::Worker(e.to_string()))?;
            slots[position] = Some(result);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| BuildError::Worker("job produced no result".into())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let pool = WorkerPool::new(4);
        let items: Vec<u64> = (0..32).collect();
        let out = pool
            .map(items, |n| {
                // Later items finish first
                std::thread::sleep(Duration::from_millis(32 - n));
                n * 2
            })
            .await
            .unwrap();
        assert_eq!(out, (0..32).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        pool.map((0..16).collect::<Vec<_>>(), move |_: i32| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            r.fetch_sub(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = WorkerPool::new(3);
        let out: Vec<i32> = pool.map(Vec::<i32>::new(), |n| n).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_a_worker_error() {
        let pool = WorkerPool::new(2);
        let result = pool
            .map(vec![1, 2, 3], |n: i32| {
                if n == 2 {
                    panic!("boom");
                }
                n
            })
            .await;
        assert!(matches!(result, Err(BuildError::Worker(_))));
    }

    #[test]
    fn test_zero_jobs_means_one() {
        assert_eq!(WorkerPool::new(0).jobs(), 1);
    }
}
