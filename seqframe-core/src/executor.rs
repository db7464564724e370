//! Scheduling substrate seam.
//!
//! Datasets initialise through an [`Executor`] so header decoding can run off
//! the caller's thread. Task dispatch belongs to the executor implementation;
//! this crate only ships the inline variant.

/// Fire-and-wait execution of a single function.
pub trait Executor: Send + Sync {
    /// Runs `f` to completion and returns its result.
    fn run_function<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send;

    /// Number of workers available for partition-level parallelism.
    fn worker_count(&self) -> usize;
}

/// Runs everything on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn run_function<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        f()
    }

    fn worker_count(&self) -> usize {
        1
    }
}
