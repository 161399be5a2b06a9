//! Passive log manager handle.

use std::sync::atomic::{AtomicU64, Ordering};

/// Log sequence number.
pub type Lsn = u64;

/// Nothing has been made durable yet.
pub const INVALID_LSN: Lsn = Lsn::MAX;

/// Tracks the highest LSN known to be durable.
///
/// Attached to a buffer pool with `BufferPoolManager::with_log_manager`.
#[derive(Debug)]
pub struct LogManager {
    persistent_lsn: AtomicU64,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            persistent_lsn: AtomicU64::new(INVALID_LSN),
        }
    }

    /// Highest durable LSN, or `None` if nothing was flushed.
    pub fn persistent_lsn(&self) -> Option<Lsn> {
        let lsn = self.persistent_lsn.load(Ordering::Acquire);
        (lsn != INVALID_LSN).then_some(lsn)
    }

    /// Record that everything up to `lsn` is durable.
    ///
    /// The value only moves forward; a stale update is ignored.
    pub fn set_persistent_lsn(&self, lsn: Lsn) {
        let _ = self
            .persistent_lsn
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current == INVALID_LSN || lsn > current).then_some(lsn)
            });
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_without_durable_lsn() {
        let log = LogManager::new();
        assert_eq!(log.persistent_lsn(), None);
    }

    #[test]
    fn test_persistent_lsn_only_advances() {
        let log = LogManager::new();
        log.set_persistent_lsn(10);
        assert_eq!(log.persistent_lsn(), Some(10));

        log.set_persistent_lsn(4);
        assert_eq!(log.persistent_lsn(), Some(10));

        log.set_persistent_lsn(11);
        assert_eq!(log.persistent_lsn(), Some(11));
    }
}
