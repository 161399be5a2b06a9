//! Storage layer - disk I/O and page buffers.
//!
//! - [`DiskManager`] - The raw, synchronous page read/write primitive
//! - [`DiskScheduler`] - Background queue turning requests into completions
//! - [`page`] - Page buffers

mod disk_manager;
mod disk_scheduler;
pub mod page;

pub use disk_manager::{DiskManager, FileDiskManager, MemoryDiskManager};
pub use disk_scheduler::{DiskCallback, DiskCompletion, DiskRequest, DiskScheduler, IoKind};
