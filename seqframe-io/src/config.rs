//! Read configuration: tile sizing and worker count.

use crate::Result;
use seqframe_core::Error as CoreError;
use std::num::NonZeroUsize;
use sysinfo::System;

/// Default upper bound for the bytes materialised per tile.
pub const DEFAULT_TILE_BYTES: usize = 8 * 1024 * 1024;

/// Configuration for partitioned reading.
#[derive(Clone, Debug)]
pub struct ReadConfig {
    /// Fraction of available system memory all concurrent tiles may use (0.0 < fraction <= 1.0).
    pub memory_fraction: f64,
    /// Explicit per-tile byte budget. If set, `memory_fraction` is ignored.
    pub tile_bytes: Option<usize>,
    /// Number of workers processing partitions concurrently.
    pub parallelism: Option<usize>,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            memory_fraction: 0.25,
            tile_bytes: None,
            parallelism: None,
        }
    }
}

impl ReadConfig {
    /// Set the fraction of available system memory to target.
    #[must_use]
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = fraction;
        self
    }

    /// Set an explicit per-tile byte budget.
    ///
    /// Values less than 1 are clamped to 1.
    #[must_use]
    pub fn with_tile_bytes(mut self, bytes: usize) -> Self {
        self.tile_bytes = Some(bytes.max(1));
        self
    }

    /// Set the number of workers.
    ///
    /// Values less than 1 are clamped to 1. Use [`Self::try_with_parallelism`]
    /// to surface invalid values as an error instead.
    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = Some(workers.max(1));
        self
    }

    /// Fallible variant of [`Self::with_tile_bytes`].
    ///
    /// # Errors
    /// Returns an error if `bytes` is 0.
    pub fn try_with_tile_bytes(mut self, bytes: usize) -> Result<Self> {
        if bytes == 0 {
            return Err(CoreError::Config("tile_bytes must be at least 1".to_string()).into());
        }
        self.tile_bytes = Some(bytes);
        Ok(self)
    }

    /// Fallible variant of [`Self::with_parallelism`].
    ///
    /// # Errors
    /// Returns an error if `workers` is 0.
    pub fn try_with_parallelism(mut self, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(CoreError::Config("parallelism must be at least 1".to_string()).into());
        }
        self.parallelism = Some(workers);
        Ok(self)
    }

    /// Configured worker count, or the machine's available parallelism.
    #[must_use]
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or_else(|| {
                std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
            })
            .max(1)
    }

    /// Resolve the per-tile byte budget.
    ///
    /// An explicit `tile_bytes` wins; otherwise the available memory share is
    /// divided among the workers and capped at [`DEFAULT_TILE_BYTES`].
    ///
    /// # Errors
    /// Returns an error if the memory fraction is invalid or system memory cannot be queried.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn resolve_tile_bytes(&self) -> Result<usize> {
        if let Some(bytes) = self.tile_bytes {
            return Ok(bytes.max(1));
        }
        if !(0.0 < self.memory_fraction && self.memory_fraction <= 1.0) {
            return Err(
                CoreError::Config("memory_fraction must be in (0.0, 1.0]".to_string()).into(),
            );
        }
        let mut system = System::new();
        system.refresh_memory();
        let available = system.available_memory();
        if available == 0 {
            return Err(
                CoreError::Config("available system memory reported as 0".to_string()).into(),
            );
        }
        let share = (available as f64 * self.memory_fraction).floor() as u64;
        let per_worker = share / self.effective_parallelism() as u64;
        let per_worker = usize::try_from(per_worker).unwrap_or(usize::MAX);
        Ok(per_worker.clamp(1, DEFAULT_TILE_BYTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_tile_bytes_wins() {
        let config = ReadConfig::default()
            .with_memory_fraction(2.0)
            .with_tile_bytes(4096);
        assert_eq!(config.resolve_tile_bytes().unwrap(), 4096);
    }

    #[test]
    fn test_invalid_memory_fraction() {
        let config = ReadConfig::default().with_memory_fraction(0.0);
        assert!(config.resolve_tile_bytes().is_err());
        let config = ReadConfig::default().with_memory_fraction(1.5);
        assert!(config.resolve_tile_bytes().is_err());
    }

    #[test]
    fn test_parallelism_clamped() {
        assert_eq!(
            ReadConfig::default().with_parallelism(0).effective_parallelism(),
            1
        );
        assert!(ReadConfig::default().try_with_parallelism(0).is_err());
        assert!(ReadConfig::default().try_with_tile_bytes(0).is_err());
        assert!(ReadConfig::default().effective_parallelism() >= 1);
    }
}
