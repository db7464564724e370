//! Optional dark-field and gain correction arrays.
//!
//! Corrections live next to the dataset file as `<path>.dark.mrc` and
//! `<path>.gain.mrc`. A missing file is not an error; that slot is simply
//! absent. Loaded shapes are not checked until [`CorrectionSet::apply`].

use crate::mrc::read_mrc;
use crate::{Error, Result};
use log::{debug, info};
use ndarray::{ArrayD, ArrayViewMut2, Ix2};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to the dataset path to find the dark frame.
pub const DARK_SUFFIX: &str = ".dark.mrc";

/// Suffix appended to the dataset path to find the gain map.
pub const GAIN_SUFFIX: &str = ".gain.mrc";

/// Produces a dense array from an auxiliary file.
pub trait CorrectionSource: Send + Sync {
    /// Loads the array stored at `path`, squeezed to its minimal rank.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded.
    fn load(&self, path: &Path) -> Result<ArrayD<f32>>;
}

/// Reads correction arrays from MRC files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MrcSource;

impl CorrectionSource for MrcSource {
    fn load(&self, path: &Path) -> Result<ArrayD<f32>> {
        read_mrc(path)
    }
}

/// Dark frame and gain map, each optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionSet {
    pub dark: Option<ArrayD<f32>>,
    pub gain: Option<ArrayD<f32>>,
}

impl CorrectionSet {
    #[must_use]
    pub fn has_dark(&self) -> bool {
        self.dark.is_some()
    }

    #[must_use]
    pub fn has_gain(&self) -> bool {
        self.gain.is_some()
    }

    /// Returns true when neither correction is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dark.is_none() && self.gain.is_none()
    }

    /// Applies `(frame - dark) * gain` in place, skipping absent terms.
    ///
    /// # Errors
    /// Returns [`Error::Correction`] if a correction array does not match the frame shape.
    pub fn apply(&self, frame: &mut ArrayViewMut2<f32>) -> Result<()> {
        if let Some(dark) = &self.dark {
            let dark = as_frame(dark, frame.dim(), "dark frame")?;
            frame.zip_mut_with(&dark, |v, &d| *v -= d);
        }
        if let Some(gain) = &self.gain {
            let gain = as_frame(gain, frame.dim(), "gain map")?;
            frame.zip_mut_with(&gain, |v, &g| *v *= g);
        }
        Ok(())
    }
}

fn as_frame<'a>(
    array: &'a ArrayD<f32>,
    dim: (usize, usize),
    what: &str,
) -> Result<ndarray::ArrayView2<'a, f32>> {
    let mismatch = || {
        Error::Correction(format!(
            "{what} of shape {:?} does not match signal shape {:?}",
            array.shape(),
            [dim.0, dim.1]
        ))
    };
    let view = array.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
    if view.dim() != dim {
        return Err(mismatch());
    }
    Ok(view)
}

/// Probes for and loads the correction files belonging to a dataset.
#[derive(Debug, Clone, Default)]
pub struct CorrectionLoader<S = MrcSource> {
    source: S,
}

impl CorrectionLoader<MrcSource> {
    /// Loader reading MRC files.
    #[must_use]
    pub fn new() -> Self {
        Self { source: MrcSource }
    }
}

impl<S: CorrectionSource> CorrectionLoader<S> {
    /// Loader using a custom array source.
    #[must_use]
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Loads `<base>.dark.mrc` and `<base>.gain.mrc` where present.
    ///
    /// # Errors
    /// Returns an error if a correction file exists but cannot be decoded.
    pub fn load(&self, base: &Path) -> Result<CorrectionSet> {
        let set = CorrectionSet {
            dark: self.load_optional(&sibling(base, DARK_SUFFIX))?,
            gain: self.load_optional(&sibling(base, GAIN_SUFFIX))?,
        };
        if !set.is_empty() {
            info!(
                "corrections for {}: dark={}, gain={}",
                base.display(),
                set.has_dark(),
                set.has_gain()
            );
        }
        Ok(set)
    }

    fn load_optional(&self, path: &Path) -> Result<Option<ArrayD<f32>>> {
        if !path.exists() {
            debug!("no correction file at {}", path.display());
            return Ok(None);
        }
        self.source.load(path).map(Some)
    }
}

/// `base` with `suffix` appended to its final component.
#[must_use]
pub fn sibling(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mrc::write_mrc;
    use ndarray::{arr2, Array2};
    use tempfile::TempDir;

    #[test]
    fn test_sibling_paths() {
        let base = Path::new("/data/scan.seq");
        assert_eq!(
            sibling(base, DARK_SUFFIX),
            PathBuf::from("/data/scan.seq.dark.mrc")
        );
        assert_eq!(
            sibling(base, GAIN_SUFFIX),
            PathBuf::from("/data/scan.seq.gain.mrc")
        );
    }

    #[test]
    fn test_missing_files_are_absent() {
        let dir = TempDir::new().unwrap();
        let set = CorrectionLoader::new()
            .load(&dir.path().join("scan.seq"))
            .unwrap();
        assert!(set.is_empty());
        assert!(!set.has_dark());
        assert!(!set.has_gain());
    }

    #[test]
    fn test_loads_present_files() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("scan.seq");
        let dark = Array2::from_elem((2, 2), 1.0f32);
        write_mrc(sibling(&base, DARK_SUFFIX), &dark.view().into_dyn()).unwrap();

        let set = CorrectionLoader::new().load(&base).unwrap();
        assert_eq!(set.dark, Some(dark.into_dyn()));
        assert!(set.gain.is_none());
    }

    #[test]
    fn test_custom_source() {
        struct Ones;
        impl CorrectionSource for Ones {
            fn load(&self, _path: &Path) -> Result<ArrayD<f32>> {
                Ok(ArrayD::ones(ndarray::IxDyn(&[2, 2])))
            }
        }
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("scan.seq");
        std::fs::write(sibling(&base, GAIN_SUFFIX), b"anything").unwrap();
        let set = CorrectionLoader::with_source(Ones).load(&base).unwrap();
        assert!(set.has_gain());
        assert!(!set.has_dark());
    }

    #[test]
    fn test_apply() {
        let set = CorrectionSet {
            dark: Some(arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn()),
            gain: Some(Array2::from_elem((2, 2), 2.0f32).into_dyn()),
        };
        let mut frame = arr2(&[[11.0f32, 12.0], [13.0, 14.0]]);
        set.apply(&mut frame.view_mut()).unwrap();
        assert_eq!(frame, Array2::from_elem((2, 2), 20.0f32));
    }

    #[test]
    fn test_apply_shape_mismatch_is_lazy() {
        let set = CorrectionSet {
            dark: Some(Array2::<f32>::zeros((3, 3)).into_dyn()),
            gain: None,
        };
        let mut frame = Array2::<f32>::zeros((2, 2));
        let err = set.apply(&mut frame.view_mut()).unwrap_err();
        assert!(matches!(err, Error::Correction(_)));
    }
}
