//! Bounded-concurrency worker pool (§5: "batch-parallel scheduling, a
//! bounded-concurrency pool per stage, default 5, capped at configured
//! MAX"). Every pipeline stage fans out over independent work items
//! `(humVersionId, language)` through this one mechanism.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(concurrency.max(1))) }
    }

    /// Runs `f` once per item in `items`, at most `concurrency` at a time.
    /// Results come back in the same order as `items`, regardless of which
    /// task finishes first — stages fold them into a `StageReport` keyed by
    /// each item's own identity, so ordering isn't load-bearing, but a
    /// stable order keeps output diffs small between runs.
    pub async fn run<T, F, Fut, O>(&self, items: Vec<T>, f: F) -> Vec<O>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Send + 'static,
    {
        let f = Arc::new(f);
        let mut set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            let f = Arc::clone(&f);
            set.spawn(async move {
                let _permit = permits.acquire_owned().await.expect("worker pool semaphore never closes");
                let output = f(item).await;
                (index, output)
            });
        }

        let mut slots: Vec<Option<O>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (index, output) = joined.expect("worker pool task panicked");
            if slots.len() <= index {
                slots.resize_with(index + 1, || None);
            }
            slots[index] = Some(output);
        }

        slots.into_iter().map(|slot| slot.expect("every spawned index is filled exactly once")).collect()
    }
}
