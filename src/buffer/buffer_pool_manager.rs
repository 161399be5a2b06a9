//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory over a fixed arena of frames
//! - Pin-based reference counting through RAII guards
//! - LRU-K victim selection with dirty page write-back
//! - All disk traffic routed through the [`DiskScheduler`]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BasicPageGuard, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::{DiskManager, DiskScheduler};

/// Structural state, only touched under the pool lock.
#[derive(Debug)]
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page. Taken from the front, returned to the back.
    free_list: VecDeque<FrameId>,
}

/// Manages a pool of buffer frames for caching disk pages.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  state: Mutex ─────────────┐                                 │
/// │  ┌──────────────┐  ┌───────┴──────┐                          │
/// │  │ page_table   │  │  free_list   │   frames: Vec<Frame>     │
/// │  │PageId → Fid  │─▶│VecDeque<Fid> │   [F0] [F1] [F2] ...     │
/// │  └──────────────┘  └──────────────┘     │ per-page RwLock    │
/// │  ┌──────────────┐  ┌──────────────┐     ▼                    │
/// │  │   replacer   │  │  scheduler   │──▶ DiskManager           │
/// │  │  LRU-K       │  │ worker pool  │                          │
/// │  └──────────────┘  └──────────────┘                          │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - `state`: one mutex over the page table and free list; every pin,
///   unpin and eviction decision happens while holding it
/// - each frame's page latch: taken by guards only after `state` is released
/// - guards release their latch before they unpin
///
/// The only I/O done under `state` is the write-back and read performed
/// when a frame changes owner, on frames nobody has pinned.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(10, 2, MemoryDiskManager::new())?;
///
/// let page_id = {
///     let mut guard = bpm.new_page()?;
///     guard.as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// }; // guard drops: latch released, page unpinned dirty
///
/// let guard = bpm.fetch_page_read(page_id)?;
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Fixed arena; a `FrameId` is an index into it.
    frames: Vec<Frame>,

    state: Mutex<PoolState>,

    replacer: LruKReplacer,

    scheduler: DiskScheduler,

    /// Next page id to hand out. Never decreases.
    next_page_id: AtomicU32,

    stats: BufferPoolStats,

    log_manager: Option<Arc<LogManager>>,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames with an LRU-`replacer_k` replacer.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if either argument is zero, or an I/O error if
    /// the disk scheduler cannot start.
    pub fn new<D: DiskManager + 'static>(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: D,
    ) -> Result<Self> {
        let config = BufferPoolConfig::default()
            .pool_size(pool_size)
            .replacer_k(replacer_k);
        Self::with_config(config, disk_manager)
    }

    /// Create a pool from a validated configuration.
    pub fn with_config<D: DiskManager + 'static>(
        config: BufferPoolConfig,
        disk_manager: D,
    ) -> Result<Self> {
        config.validate()?;

        let scheduler = DiskScheduler::new(disk_manager, config.io_workers)?;
        let first_page_id = scheduler.num_pages();

        let frames: Vec<Frame> = (0..config.pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();

        debug!(
            pool_size = config.pool_size,
            replacer_k = config.replacer_k,
            io_workers = config.io_workers,
            first_page_id,
            "buffer pool created"
        );

        Ok(Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(config.pool_size),
                free_list,
            }),
            replacer: LruKReplacer::new(config.pool_size, config.replacer_k),
            scheduler,
            next_page_id: AtomicU32::new(first_page_id),
            stats: BufferPoolStats::new(),
            log_manager: None,
        })
    }

    /// Attach a log manager for higher layers to find.
    pub fn with_log_manager(mut self, log_manager: Arc<LogManager>) -> Self {
        self.log_manager = Some(log_manager);
        self
    }

    // ========================================================================
    // Public API: Create pages
    // ========================================================================

    /// Allocate a new zeroed page and return it write-latched.
    ///
    /// The new id is `guard.page_id()`. The page starts clean, so it only
    /// reaches disk if it is modified.
    ///
    /// # Errors
    /// `Error::NoFreeFrames` if every frame is pinned.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        Ok(PageWriteGuard::new(self, frame_id, page_id))
    }

    /// Allocate a new zeroed page and return it pinned but unlatched.
    pub fn new_page_guarded(&self) -> Result<BasicPageGuard<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Hand out the next page id. Ids are never reused.
    ///
    /// Once the id space is used up this returns `PageId::INVALID` forever
    /// instead of wrapping back to 0.
    pub fn allocate_page(&self) -> PageId {
        self.try_allocate_page().unwrap_or(PageId::INVALID)
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page pinned but unlatched.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for `PageId::INVALID`
    /// - `Error::PageNotFound` if the id was never allocated
    /// - `Error::NoFreeFrames` if the page is not resident and every frame is pinned
    /// - I/O errors from the victim write-back or the read
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<BasicPageGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        Ok(BasicPageGuard::new(self, frame_id, page_id))
    }

    /// Fetch a page for reading (shared latch).
    ///
    /// Blocks while another thread holds a write guard on the same page.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        Ok(PageReadGuard::new(self, frame_id, page_id))
    }

    /// Fetch a page for writing (exclusive latch).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        Ok(PageWriteGuard::new(self, frame_id, page_id))
    }

    /// Like [`fetch_page_read`](Self::fetch_page_read), with every failure
    /// collapsed to `None`.
    pub fn checked_read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        self.fetch_page_read(page_id)
            .map_err(|e| debug!(%page_id, error = %e, "checked read failed"))
            .ok()
    }

    /// Like [`fetch_page_write`](Self::fetch_page_write), with every failure
    /// collapsed to `None`.
    pub fn checked_write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        self.fetch_page_write(page_id)
            .map_err(|e| debug!(%page_id, error = %e, "checked write failed"))
            .ok()
    }

    // ========================================================================
    // Public API: Unpin, flush, delete
    // ========================================================================

    /// Drop one pin on a resident page.
    ///
    /// `is_dirty = true` marks the page dirty; `false` never clears a dirty
    /// flag set by someone else. When the last pin goes the frame becomes
    /// evictable.
    ///
    /// Returns `false` if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id.0];
        let Some(remaining) = frame.unpin() else {
            return false;
        };

        if is_dirty {
            frame.mark_dirty();
        }
        if remaining == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Write a resident page to disk and mark it clean.
    ///
    /// The page is pinned and shared-latched for the duration of the write,
    /// so concurrent readers proceed and writers wait. Must not be called
    /// while this thread holds a write guard on the same page.
    ///
    /// Returns `Ok(false)` if the page is not resident.
    ///
    /// # Errors
    /// The write's I/O error; the page stays dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let state = self.state.lock();
            let Some(&frame_id) = state.page_table.get(&page_id) else {
                return Ok(false);
            };
            self.frames[frame_id.0].pin();
            self.replacer.set_evictable(frame_id, false);
            frame_id
        };

        let result = self.write_back(frame_id, page_id);
        self.unpin_page(page_id, false);
        result.map(|()| true)
    }

    /// Flush every resident dirty page.
    ///
    /// Each page is shared-latched while it is written, so this must not be
    /// called while this thread holds a write guard on any resident page.
    ///
    /// # Errors
    /// Stops at the first failed write.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageId> = self.state.lock().page_table.keys().copied().collect();

        let mut flushed = 0usize;
        for page_id in resident {
            if self.is_dirty(page_id) == Some(true) && self.flush_page(page_id)? {
                flushed += 1;
            }
        }
        debug!(flushed, "flushed all dirty pages");
        Ok(())
    }

    /// Remove a page from the pool and free it on disk.
    ///
    /// Returns `true` if the page is gone afterwards (including when it was
    /// never resident) and `false` if it is pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            debug!(%page_id, pin_count = frame.pin_count(), "cannot delete pinned page");
            return false;
        }

        state.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);
        self.scheduler.deallocate_page(page_id);

        debug!(%page_id, %frame_id, "deleted page");
        true
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn replacer_k(&self) -> usize {
        self.replacer.k()
    }

    /// Frames currently on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Pages currently resident.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Resident frames that could be evicted right now.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Pin count of a resident page, `None` if not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Dirty flag of a resident page, `None` if not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].is_dirty())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    #[inline]
    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    /// Pin `frame_id` in the replacer's eyes: record the access and take it
    /// off the eviction list.
    fn touch(&self, frame_id: FrameId) -> Result<()> {
        self.replacer.record_access(frame_id)?;
        self.replacer.set_evictable(frame_id, false);
        Ok(())
    }

    /// Bump the id counter, refusing to reach the `INVALID` sentinel.
    fn try_allocate_page(&self) -> Result<PageId> {
        self.next_page_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                (next < PageId::INVALID.as_u32()).then(|| next + 1)
            })
            .map(PageId::new)
            .map_err(|_| {
                error!("page id space exhausted");
                Error::PageIdsExhausted
            })
    }

    fn new_page_internal(&self) -> Result<(FrameId, PageId)> {
        let mut state = self.state.lock();
        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = match self.try_allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.reset();
        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.touch(frame_id)?;

        debug!(%page_id, %frame_id, "allocated new page");
        Ok((frame_id, page_id))
    }

    /// Pin `page_id` into a frame, reading it from disk on a miss.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        if page_id.as_u32() >= self.next_page_id.load(Ordering::Relaxed) {
            return Err(Error::PageNotFound(page_id));
        }

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            self.touch(frame_id)?;
            self.stats.record_hit();
            trace!(%page_id, %frame_id, "cache hit");
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        if let Err(e) = self.scheduler.read_page(page_id, frame.shared_page()) {
            warn!(%page_id, %frame_id, error = %e, "failed to read page, frame returned to free list");
            frame.reset();
            state.free_list.push_back(frame_id);
            return Err(e);
        }
        self.stats.record_read();

        frame.set_page_id(Some(page_id));
        frame.clear_dirty();
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.touch(frame_id)?;

        debug!(%page_id, %frame_id, "cache miss, page loaded");
        Ok(frame_id)
    }

    /// Take a frame off the free list, or evict one.
    ///
    /// The returned frame is unmapped and unpinned. A dirty victim is
    /// written back first.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if frame.is_pinned() {
            error!(%frame_id, pin_count = frame.pin_count(), "replacer chose a pinned victim");
            debug_assert_eq!(frame.pin_count(), 0, "replacer chose pinned {}", frame_id);
            // Put it back the way it was: registered and not evictable.
            self.touch(frame_id)?;
            return Err(Error::Internal(format!("pinned {} chosen as victim", frame_id)));
        }

        let old_page_id = frame.page_id();
        let was_dirty = frame.is_dirty();

        if let (Some(old_page_id), true) = (old_page_id, was_dirty) {
            if let Err(e) = self.scheduler.write_page(old_page_id, frame.shared_page()) {
                warn!(page_id = %old_page_id, %frame_id, error = %e, "victim write-back failed");
                // Unseen frames come back registered as evictable.
                self.replacer.record_access(frame_id)?;
                return Err(e);
            }
            frame.clear_dirty();
            self.stats.record_write();
        }

        if let Some(old_page_id) = old_page_id {
            state.page_table.remove(&old_page_id);
            debug!(page_id = %old_page_id, %frame_id, was_dirty, "evicted page");
        }
        frame.set_page_id(None);
        self.stats.record_eviction(was_dirty);

        Ok(frame_id)
    }

    /// Write one pinned frame out under its shared latch.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        // Recursive, so a caller already holding a read guard can flush.
        let latch = frame.shared_page().read_recursive();

        // Cleared first so a writer that dirties the page after this write
        // is never lost.
        frame.clear_dirty();
        let result = self.scheduler.write_page(page_id, frame.shared_page());
        drop(latch);

        match &result {
            Ok(()) => {
                self.stats.record_write();
                trace!(%page_id, %frame_id, "flushed page");
            }
            Err(e) => {
                frame.mark_dirty();
                warn!(%page_id, %frame_id, error = %e, "flush failed");
            }
        }
        result
    }
}
