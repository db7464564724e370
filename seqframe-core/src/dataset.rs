//! Dataset capability traits and shared metadata.

use crate::{DType, Result, Shape};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable dataset metadata shared by all partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataSetMeta {
    /// Logical shape: navigation dimensions followed by signal dimensions.
    pub shape: Shape,
    /// Element type as stored on disk.
    pub raw_dtype: DType,
}

/// A named, human-readable diagnostic value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub name: String,
    pub value: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// What a scheduling substrate needs from a dataset.
pub trait DataSet {
    /// Unit of parallel work.
    type Partition: Send;

    /// Shared metadata.
    fn meta(&self) -> &DataSetMeta;

    /// Enumerates partitions covering every frame exactly once, in frame order.
    ///
    /// # Errors
    /// Returns an error if the file set cannot be restricted to a planned range.
    fn partitions(&self) -> Result<Vec<Self::Partition>>;

    fn shape(&self) -> &Shape {
        &self.meta().shape
    }

    fn dtype(&self) -> DType {
        self.meta().raw_dtype
    }
}
