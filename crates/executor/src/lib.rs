//! Worker pools for folio batch builds.
//!
//! [`BatchExecutor::for_workers`] picks sequential execution for one worker
//! and a dedicated rayon pool (feature `rayon`) for more.

#[cfg(feature = "rayon")]
mod rayon_executor;

#[cfg(feature = "rayon")]
pub use rayon_executor::PooledExecutor;

pub use folio_traits::{Executor, ExecutorError, SequentialExecutor, TaskPanic};

/// The executor a batch runs on.
///
/// `Executor` has generic methods and cannot be a trait object, so the
/// concrete choice lives in this enum.
#[derive(Clone, Debug)]
pub enum BatchExecutor {
    Sequential(SequentialExecutor),
    #[cfg(feature = "rayon")]
    Pooled(PooledExecutor),
}

impl BatchExecutor {
    /// An executor running at most `max_workers` items at once.
    ///
    /// If a pool cannot be built the batch still runs, sequentially.
    pub fn for_workers(max_workers: usize) -> Self {
        if max_workers <= 1 {
            return BatchExecutor::Sequential(SequentialExecutor);
        }
        #[cfg(feature = "rayon")]
        {
            match PooledExecutor::new(max_workers) {
                Ok(pool) => BatchExecutor::Pooled(pool),
                Err(e) => {
                    log::warn!("{}; building sequentially", e);
                    BatchExecutor::Sequential(SequentialExecutor)
                }
            }
        }
        #[cfg(not(feature = "rayon"))]
        {
            BatchExecutor::Sequential(SequentialExecutor)
        }
    }
}

impl Executor for BatchExecutor {
    fn execute_all<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskPanic>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
    {
        match self {
            BatchExecutor::Sequential(exec) => exec.execute_all(items, f),
            #[cfg(feature = "rayon")]
            BatchExecutor::Pooled(exec) => exec.execute_all(items, f),
        }
    }

    fn workers(&self) -> usize {
        match self {
            BatchExecutor::Sequential(exec) => exec.workers(),
            #[cfg(feature = "rayon")]
            BatchExecutor::Pooled(exec) => exec.workers(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BatchExecutor::Sequential(exec) => exec.name(),
            #[cfg(feature = "rayon")]
            BatchExecutor::Pooled(exec) => exec.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_worker_is_sequential() {
        let exec = BatchExecutor::for_workers(1);
        assert_eq!(exec.name(), "sequential");
        assert_eq!(exec.workers(), 1);
        let exec = BatchExecutor::for_workers(0);
        assert_eq!(exec.workers(), 1);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_multiple_workers_get_a_sized_pool() {
        let exec = BatchExecutor::for_workers(4);
        assert_eq!(exec.name(), "rayon");
        assert_eq!(exec.workers(), 4);
        let results: Vec<i32> = exec
            .execute_all(vec![1, 2, 3], |x| x + 1)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(results, vec![2, 3, 4]);
    }
}
