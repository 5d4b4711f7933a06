use folio_traits::{isolate, Executor, ExecutorError, TaskPanic};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::sync::Arc;

/// A dedicated rayon pool sized to one batch.
///
/// The pool is owned, so capping a batch at `max_workers` never touches
/// rayon's global pool.
#[derive(Clone)]
pub struct PooledExecutor {
    pool: Arc<ThreadPool>,
    workers: usize,
}

impl PooledExecutor {
    pub fn new(workers: usize) -> Result<Self, ExecutorError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("folio-build-{}", i))
            .build()
            .map_err(|e| ExecutorError::Pool(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
            workers,
        })
    }
}

impl fmt::Debug for PooledExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledExecutor").field("workers", &self.workers).finish()
    }
}

impl Executor for PooledExecutor {
    fn execute_all<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskPanic>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
    {
        self.pool
            .install(move || items.into_par_iter().map(|item| isolate(|| f(item))).collect())
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn name(&self) -> &'static str {
        "rayon"
    }
}
