//! seqframe-jobs: Map/reduce jobs over partitioned datasets.
//!
//! A [`Job`] enumerates one [`Task`] per dataset partition. Each task streams
//! its partition tile by tile into a private accumulator and returns
//! [`ResultTile`]s that merge into the job's final result in any order.
//!
//! # Key Components
//!
//! - [`SumFramesJob`] - Sum of all frames over the navigation axes
//! - [`run_job`] - Runs tasks on a rayon pool and reduces their results
//! - [`TaskContext`] - Tile budget and cancellation flag seen by every task

mod error;
pub mod job;
pub mod runner;
pub mod sum;

pub use error::{Error, Result};
pub use job::{Job, ResultTile, Task, TaskContext};
pub use runner::{run_job, run_tasks, RunOptions};
pub use sum::{SumFramesJob, SumFramesTask, SumResultTile};
