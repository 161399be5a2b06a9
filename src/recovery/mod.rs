//! Recovery hooks.
//!
//! The buffer pool only carries a [`LogManager`] handle so higher layers
//! can find it; it never forces the log itself.

mod log_manager;

pub use log_manager::{LogManager, Lsn, INVALID_LSN};
