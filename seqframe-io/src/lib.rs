//! seqframe-io: Partitioned file access for SEQ datasets.
//!
//! This crate opens SEQ files, attaches optional dark/gain correction arrays,
//! splits the frame range into partitions and streams each partition's frames
//! in memory-bounded tiles read through memory-mapped files via memmap2.
//!

pub mod config;
pub mod corrections;
pub mod dataset;
mod error;
pub mod mrc;
mod partition;
mod reader;
pub mod tiles;
mod writer;

pub use config::{ReadConfig, DEFAULT_TILE_BYTES};
pub use corrections::{CorrectionLoader, CorrectionSet, CorrectionSource, MrcSource};
pub use dataset::{DatasetParams, DetectedParams, SeqDataset};
pub use error::{Error, Result};
pub use partition::Partition;
pub use reader::MappedFileReader;
pub use tiles::{Tile, TileStream};
pub use writer::ResultFileWriter;
