//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. The buffer pool keeps one per frame, wrapped in
//! a [`SharedPage`] so the disk scheduler can fill or drain it in place.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::config::PAGE_SIZE;

/// A frame's page buffer together with its reader/writer latch.
///
/// The latch is the per-page latch: it protects the bytes only, never the
/// buffer pool's page table.
pub type SharedPage = Arc<RwLock<Page>>;

/// A page of data (4KB, 4KB-aligned).
///
/// The layout of the bytes belongs to whoever owns the page (an index,
/// a heap file); the buffer pool treats them as opaque.
///
/// `Page` does not implement `Clone` outside tests: copying 4KB should be
/// an explicit `copy_from_slice`.
///
/// # Example
/// ```
/// use pagepool::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Allocate a zeroed page behind a fresh latch.
    pub fn new_shared() -> SharedPage {
        Arc::new(RwLock::new(Page::new()))
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Whether every byte is zero (a never-written page).
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_new_is_zeroed() {
        let page = Page::new();
        assert!(page.is_zeroed());
        assert_eq!(page.as_slice().len(), Page::size());
    }

    #[test]
    fn test_page_read_write() {
        let mut page = Page::new();

        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[4095] = 0xCD;

        assert_eq!(page.as_slice()[0], 0xFF);
        assert_eq!(page.as_slice()[4095], 0xCD);
        assert!(!page.is_zeroed());
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[100] = 0xAB;

        page.reset();

        assert!(page.is_zeroed());
    }

    #[test]
    fn test_shared_page_latch() {
        let shared = Page::new_shared();
        shared.write().as_mut_slice()[7] = 7;

        let r1 = shared.read();
        let r2 = shared.read();
        assert_eq!(r1.as_slice()[7], 7);
        assert_eq!(r2.as_slice()[7], 7);
        assert!(shared.try_write().is_none());
    }
}
