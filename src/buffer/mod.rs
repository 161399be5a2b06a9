//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between page consumers (indexes,
//! executors) and disk. It manages a fixed pool of frames, each holding at
//! most one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache itself
//! - [`Frame`] - A slot in the pool holding a page + metadata
//! - [`BasicPageGuard`] / [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins
//! - [`BufferPoolStats`] - Hit/miss and I/O counters
//! - [`replacer`] - LRU-K victim selection

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{BasicPageGuard, PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
