//! Configuration for the CMA pool simulation.

use crate::common::{Error, Result};

/// Size of the simulated CMA pool in bytes (128MB).
///
/// This is the amount of contiguous memory the VC4 driver reserves for
/// buffer objects.
pub const CMA_POOL_SIZE: u64 = 128 * 1024 * 1024;

/// Size of a page in bytes (4KB).
///
/// Used as the default extent alignment: buffer objects are backed by
/// whole pages.
pub const PAGE_SIZE: u64 = 4096;

/// Maximum length of one log line, including the terminator.
///
/// Longer lines are read in chunks of `MAX_LINE_LEN - 1` bytes and each
/// chunk counts as a line of its own.
pub const MAX_LINE_LEN: usize = 1024;

/// Marker that introduces a command in a kernel log line.
///
/// ```text
/// [   12.345678] @@@ create 8f3a2c00 16384
///              ^^^^^^
/// ```
pub const COMMAND_MARKER: &str = "] @@@ ";

/// Settings of one pool simulation.
///
/// # Example
/// ```
/// use cmapool::common::config::{PoolConfig, CMA_POOL_SIZE, PAGE_SIZE};
///
/// let config = PoolConfig::default();
/// assert_eq!(config.pool_size, CMA_POOL_SIZE);
/// assert_eq!(config.alignment, PAGE_SIZE);
///
/// let small = PoolConfig::new(2000).with_alignment(1);
/// assert!(small.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Bytes available for buffer extents.
    pub pool_size: u64,

    /// Alignment of every extent (0 or 1 for none).
    pub alignment: u64,

    /// Slide buffers towards the start of the pool when their use count drops.
    pub compact: bool,
}

impl PoolConfig {
    /// Create a config for a pool of `pool_size` bytes with page alignment.
    pub fn new(pool_size: u64) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    /// Set the extent alignment.
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// Enable or disable compaction on `remove_usecnt`.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Check the settings.
    ///
    /// # Errors
    /// - `Error::Config` if the pool is empty or the alignment is not a
    ///   power of two
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::config("pool size must be > 0"));
        }
        if self.alignment > 1 && !self.alignment.is_power_of_two() {
            return Err(Error::config(format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: CMA_POOL_SIZE,
            alignment: PAGE_SIZE,
            compact: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size() {
        assert_eq!(CMA_POOL_SIZE, 134_217_728);
        assert_eq!(CMA_POOL_SIZE % PAGE_SIZE, 0);
    }

    #[test]
    fn test_marker_shape() {
        assert!(COMMAND_MARKER.starts_with(']'));
        assert!(COMMAND_MARKER.ends_with(' '));
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new(2000).with_alignment(1).with_compact(true);
        assert_eq!(config.pool_size, 2000);
        assert_eq!(config.alignment, 1);
        assert!(config.compact);
    }

    #[test]
    fn test_validate() {
        assert!(PoolConfig::default().validate().is_ok());
        assert!(PoolConfig::new(2000).with_alignment(0).validate().is_ok());

        assert!(PoolConfig::new(0).validate().is_err());
        assert!(PoolConfig::new(2000).with_alignment(3).validate().is_err());
    }
}
