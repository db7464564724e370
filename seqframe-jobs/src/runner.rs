//! Running jobs on a rayon thread pool.

use crate::job::{Job, ResultTile, Task, TaskContext};
use crate::Result;
use log::{debug, info};
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use seqframe_io::ReadConfig;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// How a job is executed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker threads; 1 runs every task on the calling thread.
    pub parallelism: usize,
    /// Decoded byte budget per tile.
    pub tile_bytes: usize,
    /// Shared cancellation flag checked at tile boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: 1,
            tile_bytes: seqframe_io::DEFAULT_TILE_BYTES,
            cancel: None,
        }
    }
}

impl RunOptions {
    /// Derives worker count and tile budget from a read configuration.
    ///
    /// # Errors
    /// Returns an error if the tile budget cannot be resolved.
    pub fn from_config(config: &ReadConfig) -> Result<Self> {
        Ok(Self {
            parallelism: config.effective_parallelism(),
            tile_bytes: config.resolve_tile_bytes()?,
            cancel: None,
        })
    }

    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_tile_bytes(mut self, bytes: usize) -> Self {
        self.tile_bytes = bytes.max(1);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn context(&self) -> TaskContext {
        let ctx = TaskContext::new(self.tile_bytes);
        match &self.cancel {
            Some(flag) => ctx.with_cancel(Arc::clone(flag)),
            None => ctx,
        }
    }
}

/// Runs every task and returns each task's outcome, in task order.
///
/// A failing task does not affect the others.
///
/// # Errors
/// Returns an error only if the thread pool cannot be built.
pub fn run_tasks<T: Task>(
    tasks: Vec<T>,
    options: &RunOptions,
) -> Result<Vec<Result<Vec<T::Output>>>> {
    let ctx = options.context();
    if options.parallelism <= 1 {
        return Ok(tasks.iter().map(|task| task.run(&ctx)).collect());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallelism)
        .build()?;
    Ok(pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| task.run(&ctx))
            .collect()
    }))
}

/// Runs `job` and reduces all result tiles into a zeroed accumulator.
///
/// # Errors
/// Returns the first task error in task order, or a merge error.
pub fn run_job<J: Job>(job: &J, options: &RunOptions) -> Result<ArrayD<f32>> {
    let tasks = job.tasks()?;
    let shape = job.result_shape();
    info!(
        "running {} tasks on {} workers, result shape {shape:?}",
        tasks.len(),
        options.parallelism
    );

    let outcomes = run_tasks(tasks, options)?;
    let mut acc = ArrayD::<f32>::zeros(IxDyn(&shape));
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let tiles = outcome?;
        debug!("merging {} result tiles of task {i}", tiles.len());
        for tile in &tiles {
            tile.merge_into(&mut acc)?;
        }
    }
    Ok(acc)
}
