//! The batch execution seam.
//!
//! An executor runs one closure per work item and hands back one result per
//! item, in input order. A panicking item becomes a [`TaskPanic`] in its own
//! slot; the remaining items still run.

use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    #[error("Failed to build worker pool: {0}")]
    Pool(String),
}

/// A work item that panicked instead of returning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task panicked: {message}")]
pub struct TaskPanic {
    pub message: String,
}

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => "unknown panic payload".to_string(),
            },
        };
        Self { message }
    }
}

/// Runs `work`, turning a panic into a [`TaskPanic`].
pub fn isolate<R, F>(work: F) -> Result<R, TaskPanic>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(TaskPanic::from_payload)
}

pub trait Executor: Send + Sync + Debug {
    /// Applies `f` to every item. The output has one entry per item, in input order.
    fn execute_all<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskPanic>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + Clone + 'static;

    /// How many items may run at once.
    fn workers(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Runs items one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn execute_all<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskPanic>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
    {
        items.into_iter().map(|item| isolate(|| f(item))).collect()
    }

    fn workers(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}
