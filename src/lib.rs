//! pagepool - a disk-backed page cache for database storage engines.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        consumers (indexes, executors): PageId + guards          │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Buffer Pool (buffer/)                                          │
//! │     BufferPoolManager + Frame arena + page guards + stats       │
//! │     LruKReplacer chooses victims among unpinned frames          │
//! └─────────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Storage (storage/)                                             │
//! │     DiskScheduler: request queue + I/O worker threads           │
//! │     DiskManager: FileDiskManager | MemoryDiskManager            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool, guards and the LRU-K replacer
//! - [`storage`] - Pages, disk managers and the disk scheduler
//! - [`recovery`] - Log manager handle carried by the pool
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{BufferPoolManager, FileDiskManager};
//!
//! let dm = FileDiskManager::open_or_create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, 2, dm).unwrap();
//!
//! let page_id = {
//!     let mut guard = bpm.new_page().unwrap();
//!     guard.as_mut_slice()[..5].copy_from_slice(b"hello");
//!     guard.page_id()
//! };
//!
//! let guard = bpm.fetch_page_read(page_id).unwrap();
//! assert_eq!(&guard.as_slice()[..5], b"hello");
//! drop(guard);
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{
    BasicPageGuard, BufferPoolManager, BufferPoolStats, PageReadGuard, PageWriteGuard,
    StatsSnapshot,
};
pub use recovery::LogManager;
pub use storage::page::Page;
pub use storage::{DiskManager, DiskScheduler, FileDiskManager, MemoryDiskManager};
