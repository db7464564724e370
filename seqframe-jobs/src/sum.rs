//! Sum of all frames.
//!
//! Integer payloads are widened to `f32` before accumulation. Summation order
//! differs between partitionings, so results of different runs agree up to
//! floating-point rounding.

use crate::job::{Job, ResultTile, Task, TaskContext};
use crate::{Error, Result};
use log::debug;
use ndarray::{Array2, ArrayD, Axis};
use seqframe_core::DataSet;
use seqframe_io::Partition;

/// Sums every frame of a dataset into a single `(height, width)` image.
#[derive(Debug, Clone)]
pub struct SumFramesJob {
    partitions: Vec<Partition>,
    sig_shape: [usize; 2],
    apply_corrections: bool,
}

impl SumFramesJob {
    /// Plans one task per partition of `dataset`.
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be partitioned or its signal is not 2-D.
    pub fn new<D>(dataset: &D) -> Result<Self>
    where
        D: DataSet<Partition = Partition>,
    {
        let sig = dataset.shape().sig();
        let sig_shape = match sig.dims() {
            [height, width] => [*height, *width],
            other => {
                return Err(seqframe_core::Error::Config(format!(
                    "sum requires a 2-D signal shape, got {other:?}"
                ))
                .into())
            }
        };
        Ok(Self {
            partitions: dataset.partitions()?,
            sig_shape,
            apply_corrections: false,
        })
    }

    /// Applies the dataset's dark/gain corrections to each frame before summing.
    #[must_use]
    pub fn with_corrections(mut self, apply: bool) -> Self {
        self.apply_corrections = apply;
        self
    }

    #[must_use]
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }
}

impl Job for SumFramesJob {
    type Task = SumFramesTask;

    fn tasks(&self) -> Result<Vec<SumFramesTask>> {
        Ok(self
            .partitions
            .iter()
            .cloned()
            .map(|partition| SumFramesTask {
                partition,
                sig_shape: self.sig_shape,
                apply_corrections: self.apply_corrections,
            })
            .collect())
    }

    fn result_shape(&self) -> Vec<usize> {
        self.sig_shape.to_vec()
    }
}

/// Sums the frames of one partition.
#[derive(Debug, Clone)]
pub struct SumFramesTask {
    partition: Partition,
    sig_shape: [usize; 2],
    apply_corrections: bool,
}

impl SumFramesTask {
    #[must_use]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }
}

impl Task for SumFramesTask {
    type Output = SumResultTile;

    fn run(&self, ctx: &TaskContext) -> Result<Vec<SumResultTile>> {
        let corrections = self.partition.corrections();
        let correct = self.apply_corrections && !corrections.is_empty();
        let mut acc = Array2::<f32>::zeros((self.sig_shape[0], self.sig_shape[1]));

        for tile in self.partition.tiles(ctx.tile_bytes()) {
            ctx.check_cancelled()?;
            let tile = tile?;
            let mut data = tile.to_f32()?;
            if correct {
                for mut frame in data.outer_iter_mut() {
                    corrections.apply(&mut frame)?;
                }
            }
            let bounds = tile.slice().sig_bounds();
            let mut region = acc.slice_each_axis_mut(|ax| bounds[ax.axis.index()].clone().into());
            region += &data.sum_axis(Axis(0));
        }

        debug!(
            "summed frames {:?}",
            self.partition.frame_range()
        );
        Ok(vec![SumResultTile { data: acc }])
    }
}

/// Partial frame sum of one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SumResultTile {
    data: Array2<f32>,
}

impl SumResultTile {
    #[must_use]
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }
}

impl ResultTile for SumResultTile {
    fn merge_into(&self, acc: &mut ArrayD<f32>) -> Result<()> {
        if acc.shape() != self.data.shape() {
            return Err(Error::ResultShape {
                expected: acc.shape().to_vec(),
                actual: self.data.shape().to_vec(),
            });
        }
        acc.zip_mut_with(&self.data, |a, &b| *a += b);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, IxDyn};

    #[test]
    fn test_merge_adds_in_place() {
        let tile = SumResultTile {
            data: arr2(&[[1.0f32, 2.0], [3.0, 4.0]]),
        };
        let mut acc = ArrayD::<f32>::ones(IxDyn(&[2, 2]));
        tile.merge_into(&mut acc).unwrap();
        tile.merge_into(&mut acc).unwrap();
        assert_eq!(acc, arr2(&[[3.0f32, 5.0], [7.0, 9.0]]).into_dyn());
    }

    #[test]
    fn test_merge_wrong_shape() {
        let tile = SumResultTile {
            data: Array2::zeros((2, 2)),
        };
        let mut acc = ArrayD::<f32>::zeros(IxDyn(&[3, 2]));
        assert!(matches!(
            tile.merge_into(&mut acc),
            Err(Error::ResultShape { .. })
        ));
    }
}
