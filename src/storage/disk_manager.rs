//! Disk Manager - the raw page I/O primitive.
//!
//! [`DiskManager`] is the synchronous read/write-a-block contract the disk
//! scheduler drives. Two implementations are provided:
//! - [`FileDiskManager`] - pages laid out sequentially in one file
//! - [`MemoryDiskManager`] - page images kept in a map, for tests and
//!   throwaway pools

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Reads and writes fixed-size pages by id.
///
/// Implementations are synchronous and are only ever called from disk
/// scheduler workers, one call at a time.
pub trait DiskManager: Send {
    /// Fill `page` with the on-disk image of `page_id`.
    ///
    /// A page that was allocated but never written reads back as zeros.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist `page` as the image of `page_id`.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Logically free `page_id`. Physical reclamation is optional.
    fn deallocate_page(&mut self, _page_id: PageId) {}

    /// One past the highest page id that has ever been written.
    fn num_pages(&self) -> u32;
}

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page ids are allocated by the buffer pool, not here, so a write may land
/// past the current end of file; the gap reads back as zeros.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct FileDiskManager {
    file: File,
    /// Number of page slots covered by the file.
    page_count: u32,
}

impl FileDiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        debug!(path = %path.as_ref().display(), "created database file");
        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let page_count = u32::try_from(file_size / PAGE_SIZE as u64).map_err(|_| {
            Error::Internal(format!("database file too large: {} bytes", file_size))
        })?;

        debug!(path = %path.as_ref().display(), page_count, "opened database file");
        Ok(Self { file, page_count })
    }

    /// Open an existing database file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }

    fn offset(page_id: PageId) -> u64 {
        (page_id.as_u32() as u64) * (PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        if page_id.as_u32() >= self.page_count {
            debug!(%page_id, "read past end of file, returning zeroed page");
            page.reset();
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.read_exact(page.as_mut_slice())?;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        self.page_count = self.page_count.max(page_id.as_u32() + 1);
        Ok(())
    }

    #[inline]
    fn num_pages(&self) -> u32 {
        self.page_count
    }
}

/// Keeps page images in memory.
///
/// Deallocation drops the image, so a deleted page reads back as zeros.
#[derive(Default)]
pub struct MemoryDiskManager {
    pages: HashMap<PageId, Box<Page>>,
    high_water: u32,
}

impl MemoryDiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of page images currently held.
    pub fn stored_pages(&self) -> usize {
        self.pages.len()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        match self.pages.get(&page_id) {
            Some(image) => page.as_mut_slice().copy_from_slice(image.as_slice()),
            None => page.reset(),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        let image = self
            .pages
            .entry(page_id)
            .or_insert_with(|| Box::new(Page::new()));
        image.as_mut_slice().copy_from_slice(page.as_slice());
        self.high_water = self.high_water.max(page_id.as_u32() + 1);
        Ok(())
    }

    fn deallocate_page(&mut self, page_id: PageId) {
        self.pages.remove(&page_id);
    }

    fn num_pages(&self) -> u32 {
        self.high_water
    }
}
