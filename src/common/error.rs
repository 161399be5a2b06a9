//! Error types for the page cache.

use thiserror::Error;

use super::{FrameId, PageId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every error the buffer pool, replacer and disk layer can report.
///
/// Not-found and busy outcomes of `unpin_page`, `flush_page` and
/// `delete_page` are plain booleans, not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the raw disk primitive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every frame is pinned, so nothing can be evicted.
    ///
    /// The operation did not happen; callers may retry after unpinning.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The page was never allocated.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// The sentinel page id was passed where a real page was expected.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// Every page id below the sentinel has been handed out.
    #[error("Page ID space exhausted")]
    PageIdsExhausted,

    /// A frame id outside the replacer's capacity.
    #[error("Invalid frame ID: {0}")]
    InvalidFrameId(FrameId),

    /// The disk scheduler stopped before the request completed.
    #[error("Disk scheduler has shut down")]
    SchedulerShutdown,

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration rejected by `BufferPoolConfig::validate`.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the failed operation may succeed if retried later.
    ///
    /// Only capacity exhaustion qualifies; everything else is either a caller
    /// mistake, an I/O failure, or a bug.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NoFreeFrames)
    }
}
