//! SEQ dataset façade.
//!
//! [`SeqDataset`] ties together header decoding, geometry validation, the
//! optional correction arrays and partition planning. Everything it holds is
//! immutable after [`SeqDataset::open`] and shared by reference with the
//! partitions it hands out.

use crate::config::ReadConfig;
use crate::corrections::{CorrectionLoader, CorrectionSet, CorrectionSource};
use crate::partition::Partition;
use crate::{Error, Result};
use log::{debug, info};
use seqframe_core::{
    partition_count, plan_partitions, DataSet, DataSetMeta, Diagnostic, Executor,
    FileDescriptor, FileSet, Shape,
};
use seqframe_seq::{read_header, Geometry, SeqHeader, SEQ_MAGIC, SUPPORTED_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// User-facing parameters for opening a SEQ file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetParams {
    /// Path of the `.seq` file.
    pub path: PathBuf,
    /// Navigation shape the frames are arranged in, e.g. `[ny, nx]`.
    pub scan_size: Vec<usize>,
}

impl DatasetParams {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, scan_size: Vec<usize>) -> Self {
        Self {
            path: path.into(),
            scan_size,
        }
    }

    /// Checks that `scan_size` is non-empty, has no zero entries and that its
    /// frame count fits in `usize`.
    ///
    /// # Errors
    /// Returns a configuration error describing the offending value.
    pub fn validate(&self) -> Result<()> {
        self.num_frames().map(|_| ())
    }

    /// Number of frames the declared scan size covers.
    ///
    /// # Errors
    /// Returns a configuration error if `scan_size` is empty, contains a zero
    /// or its product overflows.
    pub fn num_frames(&self) -> Result<usize> {
        if self.scan_size.is_empty() {
            return Err(config_error("scan_size must not be empty"));
        }
        if self.scan_size.contains(&0) {
            return Err(config_error(&format!(
                "scan_size entries must be positive, got {:?}",
                self.scan_size
            )));
        }
        self.scan_size
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                config_error(&format!(
                    "scan_size {:?} holds more frames than can be addressed",
                    self.scan_size
                ))
            })
    }
}

/// Suggested parameters produced by format detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedParams {
    pub parameters: DatasetParams,
}

fn config_error(msg: &str) -> Error {
    seqframe_core::Error::Config(msg.to_string()).into()
}

/// An opened SEQ file arranged as `scan_size + (height, width)`.
#[derive(Debug)]
pub struct SeqDataset {
    path: PathBuf,
    header: SeqHeader,
    geometry: Geometry,
    file_size: u64,
    meta: Arc<DataSetMeta>,
    corrections: Arc<CorrectionSet>,
    workers: usize,
    partition_override: Option<usize>,
}

impl SeqDataset {
    /// Opens the file and loads `.dark.mrc` / `.gain.mrc` siblings if present.
    ///
    /// # Errors
    /// Fails if the parameters are invalid, the header cannot be read or is
    /// unsupported, the declared scan size disagrees with the frames in the
    /// file, or a present correction file cannot be decoded.
    pub fn open(params: &DatasetParams) -> Result<Self> {
        Self::open_with(params, &CorrectionLoader::new())
    }

    /// Opens the file, loading corrections through `loader`.
    ///
    /// # Errors
    /// See [`SeqDataset::open`].
    pub fn open_with<S: CorrectionSource>(
        params: &DatasetParams,
        loader: &CorrectionLoader<S>,
    ) -> Result<Self> {
        let declared = params.num_frames()?;
        let path = params.path.clone();
        let header = read_header(&path)?;
        seqframe_seq::validate(&header)?;
        let file_size = std::fs::metadata(&path)?.len();
        let geometry = Geometry::derive(&header, file_size)?;

        if declared != geometry.frame_count {
            return Err(seqframe_core::Error::ShapeMismatch {
                expected: declared,
                actual: geometry.frame_count,
            }
            .into());
        }

        let meta = DataSetMeta {
            shape: Shape::from_parts(&params.scan_size, &geometry.sig_shape()),
            raw_dtype: geometry.dtype,
        };
        let corrections = loader.load(&path)?;

        info!(
            "opened {}: {} frames of {}x{} {}, shape {}",
            path.display(),
            geometry.frame_count,
            geometry.height,
            geometry.width,
            geometry.dtype,
            meta.shape
        );

        Ok(Self {
            path,
            header,
            geometry,
            file_size,
            meta: Arc::new(meta),
            corrections: Arc::new(corrections),
            workers: ReadConfig::default().effective_parallelism(),
            partition_override: None,
        })
    }

    /// Opens the dataset on `executor`, sizing partitions for its workers.
    ///
    /// # Errors
    /// See [`SeqDataset::open`].
    pub fn initialize<E: Executor>(params: &DatasetParams, executor: &E) -> Result<Self> {
        let dataset = executor.run_function(|| Self::open(params))?;
        Ok(dataset.with_workers(executor.worker_count()))
    }

    /// Sets the worker count used to derive the partition count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Forces a fixed number of partitions.
    #[must_use]
    pub fn with_partition_count(mut self, count: usize) -> Self {
        self.partition_override = Some(count.max(1));
        self
    }

    /// Number of partitions [`DataSet::partitions`] will produce.
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.partition_override
            .unwrap_or_else(|| partition_count(self.workers, self.file_size))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &SeqHeader {
        &self.header
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn corrections(&self) -> &CorrectionSet {
        &self.corrections
    }

    /// Header fields in on-disk order, then footer size and correction flags.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = self
            .header
            .fields()
            .into_iter()
            .map(|(name, value)| Diagnostic::new(name, value))
            .collect();
        out.push(Diagnostic::new("Footer size", self.geometry.footer_size));
        out.push(Diagnostic::new(
            "Dark frame included",
            self.corrections.has_dark(),
        ));
        out.push(Diagnostic::new(
            "Gain map included",
            self.corrections.has_gain(),
        ));
        out
    }

    /// Guesses parameters for `path`, or `None` if it is not a readable SEQ file.
    ///
    /// The frame count is suggested as a one-dimensional scan; callers with a
    /// 2-D raster must refine it.
    #[must_use]
    pub fn detect_params(path: impl AsRef<Path>) -> Option<DetectedParams> {
        let path = path.as_ref();
        let header = read_header(path)
            .map_err(|err| debug!("{} is not a SEQ file: {err}", path.display()))
            .ok()?;
        if header.magic != SEQ_MAGIC {
            return None;
        }
        let file_size = std::fs::metadata(path).ok()?.len();
        let frame_count = seqframe_seq::count_frames(
            file_size,
            seqframe_seq::image_offset(header.version),
            header.true_image_size,
        );
        Some(DetectedParams {
            parameters: DatasetParams::new(path, vec![frame_count]),
        })
    }

    #[must_use]
    pub fn supported_extensions() -> &'static [&'static str] {
        SUPPORTED_EXTENSIONS
    }

    /// Identifies the dataset by path and logical shape.
    #[must_use]
    pub fn cache_key(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "shape": self.meta.shape.dims(),
        })
    }

    /// The single-file set covering every frame.
    ///
    /// # Errors
    /// Returns an error if the descriptor is inconsistent.
    pub fn fileset(&self) -> seqframe_core::Result<FileSet> {
        let g = &self.geometry;
        let descriptor = FileDescriptor::new(
            &self.path,
            0,
            g.frame_count,
            g.dtype,
            g.sig_shape().to_vec(),
            0,
            g.footer_size,
            g.image_offset,
        );
        FileSet::new(vec![descriptor])
    }
}

impl fmt::Display for SeqDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<SEQDataSet of {} shape={}>",
            self.meta.raw_dtype, self.meta.shape
        )
    }
}

impl DataSet for SeqDataset {
    type Partition = Partition;

    fn meta(&self) -> &DataSetMeta {
        &self.meta
    }

    fn partitions(&self) -> seqframe_core::Result<Vec<Partition>> {
        let fileset = self.fileset()?;
        let sig = self.geometry.sig_shape();
        plan_partitions(self.geometry.frame_count, self.num_partitions(), &sig)
            .into_iter()
            .map(|spec| {
                debug!(
                    "partition frames {}..{} of {}",
                    spec.start,
                    spec.stop,
                    self.path.display()
                );
                Ok(Partition::new(
                    Arc::clone(&self.meta),
                    fileset.restrict(spec.start, spec.stop)?,
                    spec.slice,
                    Arc::clone(&self.corrections),
                ))
            })
            .collect()
    }
}
