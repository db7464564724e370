//! Job, task and result-tile capabilities.

use crate::{Error, Result};
use ndarray::ArrayD;
use seqframe_io::DEFAULT_TILE_BYTES;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-run settings shared read-only by all tasks.
#[derive(Debug, Clone)]
pub struct TaskContext {
    tile_bytes: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_BYTES)
    }
}

impl TaskContext {
    #[must_use]
    pub fn new(tile_bytes: usize) -> Self {
        Self {
            tile_bytes: tile_bytes.max(1),
            cancel: None,
        }
    }

    /// Attaches a flag that aborts tasks at the next tile boundary once set.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Decoded byte budget per tile.
    #[must_use]
    pub fn tile_bytes(&self) -> usize {
        self.tile_bytes
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Fails with [`Error::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] when the flag is set.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A partial result that can be folded into the final accumulator.
///
/// Merging is in-place addition, so tiles may be merged in any order.
pub trait ResultTile: Send {
    /// Adds this tile into `acc`.
    ///
    /// # Errors
    /// Returns [`Error::ResultShape`] if `acc` does not have the expected shape.
    fn merge_into(&self, acc: &mut ArrayD<f32>) -> Result<()>;
}

/// Work bound to one partition.
pub trait Task: Send {
    type Output: ResultTile;

    /// Streams the partition and returns its partial results.
    ///
    /// # Errors
    /// Returns an error if reading fails or the task is cancelled.
    fn run(&self, ctx: &TaskContext) -> Result<Vec<Self::Output>>;
}

/// A computation expressed as independent tasks plus a result shape.
pub trait Job {
    type Task: Task;

    /// One task per partition, in partition order.
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be partitioned.
    fn tasks(&self) -> Result<Vec<Self::Task>>;

    /// Shape of the final accumulator.
    fn result_shape(&self) -> Vec<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = TaskContext::new(0).with_cancel(Arc::clone(&flag));
        assert_eq!(ctx.tile_bytes(), 1);
        assert!(ctx.check_cancelled().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(ctx.check_cancelled(), Err(Error::Cancelled)));
        assert!(!TaskContext::default().is_cancelled());
    }
}
