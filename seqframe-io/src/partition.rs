//! Units of parallel work over a dataset.

use crate::corrections::CorrectionSet;
use crate::tiles::TileStream;
use seqframe_core::{DataSetMeta, FileSet, Slice};
use std::ops::Range;
use std::sync::Arc;

/// A contiguous frame range of a dataset together with the files backing it.
///
/// Partitions are cheap to clone and carry no open file handles; files are
/// mapped lazily when tiles are streamed.
#[derive(Debug, Clone)]
pub struct Partition {
    meta: Arc<DataSetMeta>,
    fileset: FileSet,
    slice: Slice,
    corrections: Arc<CorrectionSet>,
}

impl Partition {
    #[must_use]
    pub fn new(
        meta: Arc<DataSetMeta>,
        fileset: FileSet,
        slice: Slice,
        corrections: Arc<CorrectionSet>,
    ) -> Self {
        Self {
            meta,
            fileset,
            slice,
            corrections,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &DataSetMeta {
        &self.meta
    }

    /// Files restricted to this partition's frames.
    #[must_use]
    pub fn fileset(&self) -> &FileSet {
        &self.fileset
    }

    /// Region of the flattened dataset covered by this partition.
    #[must_use]
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    #[must_use]
    pub fn start_frame(&self) -> usize {
        self.slice.nav_start()
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.slice.num_frames()
    }

    #[must_use]
    pub fn frame_range(&self) -> Range<usize> {
        self.slice.nav_range()
    }

    #[must_use]
    pub fn corrections(&self) -> &CorrectionSet {
        &self.corrections
    }

    /// Streams this partition's frames in tiles of at most `tile_bytes` decoded bytes.
    #[must_use]
    pub fn tiles(&self, tile_bytes: usize) -> TileStream {
        TileStream::new(&self.fileset, tile_bytes)
    }
}
