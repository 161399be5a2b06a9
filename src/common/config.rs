//! Configuration for the buffer pool.
//!
//! Compile-time constants live here alongside [`BufferPoolConfig`], the
//! runtime knobs a [`BufferPoolManager`](crate::buffer::BufferPoolManager)
//! is built from.

use super::error::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a frame maps onto exactly
/// one hardware page and aligned Direct I/O stays possible.
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages: 2^32 - 1 (one value is reserved for `PageId::INVALID`)
/// - Max database size: just under 16TB
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used by [`BufferPoolConfig::default`].
pub const DEFAULT_POOL_SIZE: usize = 128;

/// History depth used by the LRU-K replacer unless configured otherwise.
pub const DEFAULT_REPLACER_K: usize = 10;

/// Background threads servicing the disk scheduler queue.
pub const DEFAULT_IO_WORKERS: usize = 1;

/// Runtime configuration for a buffer pool.
///
/// # Example
/// ```
/// use pagepool::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default().pool_size(16).replacer_k(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames; fixed for the lifetime of the pool.
    pub pool_size: usize,
    /// `k` in LRU-K: how many accesses each frame remembers.
    pub replacer_k: usize,
    /// Worker threads draining the disk scheduler queue.
    pub io_workers: usize,
}

impl BufferPoolConfig {
    /// Set the number of frames.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the LRU-K history depth.
    pub fn replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }

    /// Set the number of disk scheduler workers.
    pub fn io_workers(mut self, workers: usize) -> Self {
        self.io_workers = workers;
        self
    }

    /// Reject configurations the pool cannot run with.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be > 0".into()));
        }
        if self.replacer_k == 0 {
            return Err(Error::InvalidConfig("replacer_k must be > 0".into()));
        }
        if self.io_workers == 0 {
            return Err(Error::InvalidConfig("io_workers must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacer_k: DEFAULT_REPLACER_K,
            io_workers: DEFAULT_IO_WORKERS,
        }
    }
}
