//! End-to-end frame sums over synthetic SEQ files.

use approx::assert_abs_diff_eq;
use ndarray::{Array2, ArrayD, IxDyn};
use seqframe_io::corrections::{sibling, DARK_SUFFIX, GAIN_SUFFIX};
use seqframe_io::mrc::write_mrc;
use seqframe_io::{DatasetParams, SeqDataset};
use seqframe_jobs::{
    run_job, run_tasks, Error, Job, ResultTile, RunOptions, SumFramesJob, Task, TaskContext,
};
use seqframe_seq::{image_offset, SeqHeader, IMAGE_FORMAT_MONOCHROME, SEQ_MAGIC};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

const HEIGHT: usize = 3;
const WIDTH: usize = 5;
const FOOTER: usize = 16;

fn pixel(frame: usize, y: usize, x: usize) -> u16 {
    u16::try_from((frame * 31 + y * 7 + x) % 1000).unwrap()
}

/// Writes a 16-bit SEQ file and returns its path.
fn write_seq(dir: &Path, frames: usize) -> PathBuf {
    let frame_bytes = HEIGHT * WIDTH * 2;
    let header = SeqHeader {
        magic: SEQ_MAGIC,
        version: 4,
        width: u32::try_from(WIDTH).unwrap(),
        height: u32::try_from(HEIGHT).unwrap(),
        bit_depth: 16,
        bit_depth_real: 12,
        image_size_bytes: u32::try_from(frame_bytes).unwrap(),
        image_format: IMAGE_FORMAT_MONOCHROME,
        true_image_size: u32::try_from(frame_bytes + FOOTER).unwrap(),
        ..SeqHeader::default()
    };
    let mut data = header.encode();
    data.resize(image_offset(header.version), 0);
    for i in 0..frames {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                data.extend_from_slice(&pixel(i, y, x).to_le_bytes());
            }
        }
        data.extend(std::iter::repeat(0xCD).take(FOOTER));
    }
    let path = dir.join("sum.seq");
    std::fs::write(&path, data).unwrap();
    path
}

fn expected_sum(frames: usize) -> Array2<f32> {
    Array2::from_shape_fn((HEIGHT, WIDTH), |(y, x)| {
        (0..frames).map(|i| f32::from(pixel(i, y, x))).sum()
    })
}

fn dataset(path: &Path, frames: usize, partitions: usize) -> SeqDataset {
    SeqDataset::open(&DatasetParams::new(path, vec![frames]))
        .unwrap()
        .with_partition_count(partitions)
}

#[test]
fn test_sum_matches_brute_force() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 23);
    let expected = expected_sum(23).into_dyn();

    for (partitions, threads, tile_bytes) in [(1, 1, 1 << 20), (4, 2, 60), (7, 3, 1), (30, 4, 90)] {
        let job = SumFramesJob::new(&dataset(&path, 23, partitions)).unwrap();
        assert_eq!(job.result_shape(), vec![HEIGHT, WIDTH]);
        let options = RunOptions::default()
            .with_parallelism(threads)
            .with_tile_bytes(tile_bytes);
        let result = run_job(&job, &options).unwrap();
        assert_abs_diff_eq!(result, expected, epsilon = 1e-3);
    }
}

#[test]
fn test_merge_order_does_not_matter() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 17);
    let job = SumFramesJob::new(&dataset(&path, 17, 5)).unwrap();
    let ctx = TaskContext::new(64);
    let tiles: Vec<_> = job
        .tasks()
        .unwrap()
        .iter()
        .flat_map(|task| task.run(&ctx).unwrap())
        .collect();
    assert_eq!(tiles.len(), 5);

    let merge = |order: &[usize]| {
        let mut acc = ArrayD::<f32>::zeros(IxDyn(&[HEIGHT, WIDTH]));
        for &i in order {
            tiles[i].merge_into(&mut acc).unwrap();
        }
        acc
    };
    let forward = merge(&[0, 1, 2, 3, 4]);
    for order in [[4, 3, 2, 1, 0], [2, 0, 4, 1, 3], [1, 3, 0, 4, 2]] {
        assert_abs_diff_eq!(merge(&order), forward, epsilon = 1e-3);
    }
    assert_abs_diff_eq!(forward, expected_sum(17).into_dyn(), epsilon = 1e-3);
}

#[test]
fn test_cancelled_run_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 8);
    let job = SumFramesJob::new(&dataset(&path, 8, 2)).unwrap();
    let options = RunOptions::default().with_cancel(Arc::new(AtomicBool::new(true)));
    assert!(matches!(run_job(&job, &options), Err(Error::Cancelled)));
}

#[test]
fn test_truncated_file_fails_only_its_task() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 12);
    let job = SumFramesJob::new(&dataset(&path, 12, 3)).unwrap();

    // drop the last frame record and a half after opening
    let len = std::fs::metadata(&path).unwrap().len();
    let record = (HEIGHT * WIDTH * 2 + FOOTER) as u64;
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - record - record / 2).unwrap();
    drop(file);

    let outcomes = run_tasks(job.tasks().unwrap(), &RunOptions::default()).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());
    match &outcomes[2] {
        Err(Error::Io(seqframe_io::Error::TruncatedFile { frame, .. })) => assert_eq!(*frame, 10),
        other => panic!("expected truncation, got {other:?}"),
    }
    assert!(matches!(
        run_job(&job, &RunOptions::default()),
        Err(Error::Io(seqframe_io::Error::TruncatedFile { .. }))
    ));
}

#[test]
fn test_sum_with_corrections() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 6);
    let dark = Array2::<f32>::from_elem((HEIGHT, WIDTH), 2.0);
    let gain = Array2::<f32>::from_shape_fn((HEIGHT, WIDTH), |(y, _)| 0.5 * (y + 1) as f32);
    write_mrc(sibling(&path, DARK_SUFFIX), &dark.view().into_dyn()).unwrap();
    write_mrc(sibling(&path, GAIN_SUFFIX), &gain.view().into_dyn()).unwrap();

    let ds = dataset(&path, 6, 2);
    let raw = run_job(&SumFramesJob::new(&ds).unwrap(), &RunOptions::default()).unwrap();
    assert_abs_diff_eq!(raw, expected_sum(6).into_dyn(), epsilon = 1e-3);

    let job = SumFramesJob::new(&ds).unwrap().with_corrections(true);
    let corrected = run_job(&job, &RunOptions::default().with_parallelism(2)).unwrap();
    let expected = (expected_sum(6) - 6.0 * &dark) * &gain;
    assert_abs_diff_eq!(corrected, expected.into_dyn(), epsilon = 1e-2);
}

#[test]
fn test_mismatched_correction_fails_at_run_time() {
    let dir = TempDir::new().unwrap();
    let path = write_seq(dir.path(), 4);
    let dark = Array2::<f32>::zeros((WIDTH, HEIGHT));
    write_mrc(sibling(&path, DARK_SUFFIX), &dark.view().into_dyn()).unwrap();

    let ds = dataset(&path, 4, 1);
    assert!(ds.corrections().has_dark());
    let job = SumFramesJob::new(&ds).unwrap().with_corrections(true);
    assert!(matches!(
        run_job(&job, &RunOptions::default()),
        Err(Error::Io(seqframe_io::Error::Correction(_)))
    ));
}
