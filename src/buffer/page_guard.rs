//! RAII guards for page access.
//!
//! Every page handed out by the buffer pool comes wrapped in a guard that
//! owns one pin:
//! - [`BasicPageGuard`] - pin only; no latch, no access to the bytes
//! - [`PageReadGuard`] - pin + shared latch (many may coexist)
//! - [`PageWriteGuard`] - pin + exclusive latch
//!
//! A guard releases on drop, or earlier via `drop_guard()`, exactly once:
//! the latch first, then the pin. Rust moves leave the source unusable, and a
//! released guard is inert, so releasing again is a no-op. Upgrading a basic
//! guard moves its pin into the new guard.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// One pin on a resident page, owned by a guard.
struct Pin<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
}

impl<'a> Pin<'a> {
    fn release(self, is_dirty: bool) {
        let released = self.bpm.unpin_page(self.page_id, is_dirty);
        debug_assert!(released, "guard released {} it did not pin", self.page_id);
    }

    fn read_latch(&self) -> RwLockReadGuard<'a, Page> {
        self.bpm.frame(self.frame_id).page()
    }

    fn write_latch(&self) -> RwLockWriteGuard<'a, Page> {
        self.bpm.frame(self.frame_id).page_mut()
    }
}

/// Guard holding a pin but no latch.
///
/// Keeps the page resident without granting access to its bytes; upgrade
/// to read or write to get at them.
pub struct BasicPageGuard<'a> {
    pin: Option<Pin<'a>>,
}

impl<'a> BasicPageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            pin: Some(Pin {
                bpm,
                frame_id,
                page_id,
            }),
        }
    }

    /// The guarded page, or `PageId::INVALID` once released.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.as_ref().map_or(PageId::INVALID, |p| p.page_id)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.pin.is_some()
    }

    /// Take the shared latch, moving the pin into a read guard.
    ///
    /// # Panics
    /// Panics if this guard was already released.
    pub fn upgrade_read(mut self) -> PageReadGuard<'a> {
        let pin = self.take_pin();
        PageReadGuard::from_pin(pin)
    }

    /// Take the exclusive latch, moving the pin into a write guard.
    ///
    /// # Panics
    /// Panics if this guard was already released.
    pub fn upgrade_write(mut self) -> PageWriteGuard<'a> {
        let pin = self.take_pin();
        PageWriteGuard::from_pin(pin)
    }

    /// Unpin now. Later calls, and the eventual drop, do nothing.
    pub fn drop_guard(&mut self) {
        if let Some(pin) = self.pin.take() {
            pin.release(false);
        }
    }

    fn take_pin(&mut self) -> Pin<'a> {
        match self.pin.take() {
            Some(pin) => pin,
            None => panic!("cannot upgrade a released page guard"),
        }
    }
}

impl Drop for BasicPageGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Guard for shared, read-only page access.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let first = guard.as_slice()[0];
/// // guard drops here: latch released, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    latch: Option<RwLockReadGuard<'a, Page>>,
    pin: Option<Pin<'a>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self::from_pin(Pin {
            bpm,
            frame_id,
            page_id,
        })
    }

    fn from_pin(pin: Pin<'a>) -> Self {
        let latch = pin.read_latch();
        Self {
            latch: Some(latch),
            pin: Some(pin),
        }
    }

    /// The guarded page, or `PageId::INVALID` once released.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.as_ref().map_or(PageId::INVALID, |p| p.page_id)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.pin.is_some()
    }

    /// Release the latch, then the pin. Idempotent.
    pub fn drop_guard(&mut self) {
        drop(self.latch.take());
        if let Some(pin) = self.pin.take() {
            pin.release(false);
        }
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.latch.as_deref().expect("page guard used after release")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Guard for exclusive write access to a page.
///
/// Mutable access marks the guard dirty; the flag is handed to the pool
/// when the pin is released.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page_write(page_id)?;
/// guard.as_mut_slice()[0] = 0xFF;
/// // guard drops here: latch released, page unpinned dirty
/// ```
pub struct PageWriteGuard<'a> {
    latch: Option<RwLockWriteGuard<'a, Page>>,
    pin: Option<Pin<'a>>,
    is_dirty: bool,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId) -> Self {
        Self::from_pin(Pin {
            bpm,
            frame_id,
            page_id,
        })
    }

    fn from_pin(pin: Pin<'a>) -> Self {
        let latch = pin.write_latch();
        Self {
            latch: Some(latch),
            pin: Some(pin),
            is_dirty: false,
        }
    }

    /// The guarded page, or `PageId::INVALID` once released.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.as_ref().map_or(PageId::INVALID, |p| p.page_id)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.pin.is_some()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Force a write-back even if the bytes were never touched mutably.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Release the latch, then the pin. Idempotent.
    pub fn drop_guard(&mut self) {
        drop(self.latch.take());
        if let Some(pin) = self.pin.take() {
            pin.release(self.is_dirty);
        }
        self.is_dirty = false;
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.latch.as_deref().expect("page guard used after release")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.is_dirty = true;
        self.latch
            .as_deref_mut()
            .expect("page guard used after release")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
