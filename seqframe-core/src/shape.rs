//! Logical array shapes and slices.
//!
//! A [`Shape`] is an ordered tuple of navigation dimensions (scan positions)
//! followed by signal dimensions (the per-frame pixel grid). A [`Slice`]
//! addresses a rectangular region of such a shape, e.g. the frames covered by
//! a partition or a tile.

use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Navigation dimensions followed by `sig_dims` signal dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    dims: Vec<usize>,
    sig_dims: usize,
}

impl Shape {
    /// Builds a shape from navigation and signal parts.
    #[must_use]
    pub fn from_parts(nav: &[usize], sig: &[usize]) -> Self {
        let mut dims = Vec::with_capacity(nav.len() + sig.len());
        dims.extend_from_slice(nav);
        dims.extend_from_slice(sig);
        Self {
            dims,
            sig_dims: sig.len(),
        }
    }

    /// All dimensions, navigation first.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of trailing signal dimensions.
    #[must_use]
    pub fn sig_dims(&self) -> usize {
        self.sig_dims
    }

    /// Number of leading navigation dimensions.
    #[must_use]
    pub fn nav_dims(&self) -> usize {
        self.dims.len() - self.sig_dims
    }

    /// The navigation part as its own shape (no signal dimensions).
    #[must_use]
    pub fn nav(&self) -> Shape {
        Shape {
            dims: self.dims[..self.nav_dims()].to_vec(),
            sig_dims: 0,
        }
    }

    /// The signal part as its own shape.
    #[must_use]
    pub fn sig(&self) -> Shape {
        Shape {
            dims: self.dims[self.nav_dims()..].to_vec(),
            sig_dims: self.sig_dims,
        }
    }

    /// Total number of elements.
    #[must_use]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of navigation positions, i.e. frames.
    #[must_use]
    pub fn nav_size(&self) -> usize {
        self.dims[..self.nav_dims()].iter().product()
    }

    /// Number of elements per frame.
    #[must_use]
    pub fn sig_size(&self) -> usize {
        self.dims[self.nav_dims()..].iter().product()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, ")")
    }
}

/// A rectangular region of a (flattened-navigation) shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slice {
    origin: Vec<usize>,
    shape: Shape,
}

impl Slice {
    /// A slice covering `num_frames` whole frames starting at flat frame `start`.
    #[must_use]
    pub fn frames(start: usize, num_frames: usize, sig_shape: &[usize]) -> Self {
        let mut origin = Vec::with_capacity(sig_shape.len() + 1);
        origin.push(start);
        origin.extend(std::iter::repeat(0).take(sig_shape.len()));
        Self {
            origin,
            shape: Shape::from_parts(&[num_frames], sig_shape),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &[usize] {
        &self.origin
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// First flat navigation index covered by this slice.
    #[must_use]
    pub fn nav_start(&self) -> usize {
        self.origin.first().copied().unwrap_or(0)
    }

    /// Number of frames covered by this slice.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.shape.nav_size()
    }

    /// Flat navigation index range covered by this slice.
    #[must_use]
    pub fn nav_range(&self) -> Range<usize> {
        let start = self.nav_start();
        start..start + self.num_frames()
    }

    /// Per-axis index ranges of the signal region this slice addresses.
    #[must_use]
    pub fn sig_bounds(&self) -> Vec<Range<usize>> {
        let nav_dims = self.shape.nav_dims();
        self.origin[nav_dims..]
            .iter()
            .zip(&self.shape.dims()[nav_dims..])
            .map(|(&origin, &len)| origin..origin + len)
            .collect()
    }
}
