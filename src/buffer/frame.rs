//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a page buffer plus the metadata the pool needs:
//! - Which page is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::{Page, SharedPage};

/// A frame in the buffer pool.
///
/// # Thread Safety
/// - `page`: the per-page reader/writer latch, shared with the disk
///   scheduler while I/O on this frame is in flight
/// - `page_id`, `pin_count`: atomics, but only *changed* while the pool's
///   structural lock is held, so pin/evict decisions are linearized
/// - `is_dirty`: atomic; set by unpinning writers, cleared by flushes
pub struct Frame {
    page: SharedPage,

    /// Resident page, `PageId::INVALID` when the frame is free.
    page_id: AtomicU32,

    pin_count: AtomicU32,

    is_dirty: AtomicBool,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: Page::new_shared(),
            page_id: AtomicU32::new(PageId::INVALID.as_u32()),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page access (latch)
    // ========================================================================

    /// Acquire the shared latch.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire the exclusive latch.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// The latched buffer itself, for handing to the disk scheduler.
    #[inline]
    pub fn shared_page(&self) -> &SharedPage {
        &self.page
    }

    // ========================================================================
    // Identity
    // ========================================================================

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let id = PageId::new(self.page_id.load(Ordering::Acquire));
        id.is_valid().then_some(id)
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        let raw = page_id.unwrap_or(PageId::INVALID).as_u32();
        self.page_id.store(raw, Ordering::Release);
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count, or `None` if it
    /// was already zero (the count never goes below zero).
    #[inline]
    pub fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .ok()
            .map(|old| old - 1)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    // ========================================================================
    // Frame state
    // ========================================================================

    /// Check if the frame is empty (no page loaded).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Zero the bytes and clear all metadata.
    ///
    /// Only called on frames nobody has pinned, so the latch is free.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Release);
        self.clear_dirty();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
