//! Partition planning.
//!
//! Splits the flattened navigation range `[0, total_frames)` into contiguous,
//! disjoint chunks that together cover every frame exactly once. The last
//! chunk absorbs the remainder of the integer division.

use crate::Slice;
use log::debug;
use std::ops::Range;

/// Target number of bytes per partition when deriving a partition count from file size.
pub const PARTITION_TARGET_BYTES: u64 = 512 * 1024 * 1024;

/// A planned partition: its logical slice and flat frame range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    /// Slice of the flattened-navigation dataset shape.
    pub slice: Slice,
    /// First frame (inclusive).
    pub start: usize,
    /// Last frame (exclusive).
    pub stop: usize,
}

impl PartitionSpec {
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.stop - self.start
    }

    #[must_use]
    pub fn frame_range(&self) -> Range<usize> {
        self.start..self.stop
    }
}

/// Number of partitions for a dataset of `total_bytes` processed by `workers` workers.
///
/// Returns `max(workers, total_bytes / 512 MiB)`, and never less than 1.
#[must_use]
pub fn partition_count(workers: usize, total_bytes: u64) -> usize {
    let by_size = usize::try_from(total_bytes / PARTITION_TARGET_BYTES).unwrap_or(usize::MAX);
    workers.max(by_size).max(1)
}

/// Splits `total_frames` frames into `partition_count` contiguous chunks.
///
/// Every chunk but the last holds `total_frames / partition_count` frames; the
/// last one also takes the remainder. When there are fewer frames than
/// partitions, the leading chunks are empty. A `partition_count` of 0 is
/// treated as 1.
#[must_use]
pub fn plan_partitions(
    total_frames: usize,
    partition_count: usize,
    sig_shape: &[usize],
) -> Vec<PartitionSpec> {
    let count = partition_count.max(1);
    let per_part = total_frames / count;
    debug!(
        "planning {count} partitions over {total_frames} frames ({per_part} frames per partition)"
    );
    (0..count)
        .map(|i| {
            let start = i * per_part;
            let stop = if i + 1 == count {
                total_frames
            } else {
                start + per_part
            };
            PartitionSpec {
                slice: Slice::frames(start, stop - start, sig_shape),
                start,
                stop,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_even_split() {
        let parts = plan_partitions(12, 4, &[2, 2]);
        let ranges: Vec<_> = parts.iter().map(PartitionSpec::frame_range).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..12]);
    }

    #[test]
    fn test_plan_last_absorbs_remainder() {
        let parts = plan_partitions(10, 4, &[2, 2]);
        let sizes: Vec<_> = parts.iter().map(PartitionSpec::num_frames).collect();
        assert_eq!(sizes, vec![2, 2, 2, 4]);
        assert_eq!(parts[3].slice.origin(), &[6, 0, 0]);
        assert_eq!(parts[3].slice.shape().dims(), &[4, 2, 2]);
    }

    #[test]
    fn test_plan_fewer_frames_than_partitions() {
        let parts = plan_partitions(3, 5, &[1, 1]);
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.iter().map(PartitionSpec::num_frames).sum::<usize>(), 3);
        assert_eq!(parts[4].frame_range(), 0..3);
    }

    #[test]
    fn test_partition_count() {
        assert_eq!(partition_count(8, 0), 8);
        assert_eq!(partition_count(0, 0), 1);
        assert_eq!(partition_count(2, 10 * PARTITION_TARGET_BYTES + 1), 10);
    }
}
