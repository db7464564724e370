//! seqframe-core: Core types for partitioned frame-sequence processing.
//!
//! This crate provides the format-agnostic building blocks: logical array
//! shapes and slices, on-disk element types, file sets mapping global frame
//! indices to byte ranges, the partition planner, and the capability traits
//! a dataset and its scheduling substrate implement.
//!

pub mod dataset;
pub mod dtype;
pub mod error;
pub mod executor;
pub mod fileset;
pub mod partition;
pub mod shape;

pub use dataset::{DataSet, DataSetMeta, Diagnostic};
pub use dtype::{DType, Element};
pub use error::{Error, Result};
pub use executor::{Executor, InlineExecutor};
pub use fileset::{FileDescriptor, FileSet};
pub use partition::{partition_count, plan_partitions, PartitionSpec, PARTITION_TARGET_BYTES};
pub use shape::{Shape, Slice};
