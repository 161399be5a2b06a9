//! LRU-K replacement policy.
//!
//! Each tracked frame remembers the timestamps of its last `k` accesses.
//! The victim is the evictable frame with the largest *backward k-distance*
//! (`now - timestamp of the k-th most recent access`). Frames with fewer than
//! `k` recorded accesses have an infinite distance and always go first;
//! among those, the one whose most recent access is oldest loses (plain LRU).

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{Error, FrameId, Result};

/// Access history of one frame.
#[derive(Debug)]
struct LruKNode {
    /// Oldest at the front, at most `k` entries.
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            is_evictable: false,
        }
    }

    fn record(&mut self, timestamp: u64, k: usize) {
        if self.history.len() == k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp);
    }

    fn eviction_key(&self, k: usize, now: u64) -> EvictionKey {
        let earliest = self.history.front().copied().unwrap_or(0);
        if self.history.len() < k {
            let last_access = self.history.back().copied().unwrap_or(0);
            EvictionKey::Infinite(Reverse(last_access))
        } else {
            EvictionKey::Finite(now - earliest, Reverse(earliest))
        }
    }
}

/// Ranks eviction candidates; the maximum is the victim.
///
/// Variant order matters: every `Infinite` outranks every `Finite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EvictionKey {
    /// Backward k-distance, then oldest retained access.
    Finite(u64, Reverse<u64>),
    /// Fewer than `k` accesses: oldest most-recent access.
    Infinite(Reverse<u64>),
}

#[derive(Debug, Default)]
struct ReplacerState {
    nodes: HashMap<FrameId, LruKNode>,
    /// Logical clock, bumped on every recorded access.
    current_timestamp: u64,
    evictable_count: usize,
}

/// Thread-safe LRU-K replacer over a fixed range of frame ids.
///
/// Every operation takes one internal lock; nothing here blocks on I/O.
///
/// # Example
/// ```
/// use pagepool::buffer::replacer::LruKReplacer;
/// use pagepool::FrameId;
///
/// let replacer = LruKReplacer::new(4, 2);
/// replacer.record_access(FrameId::new(0)).unwrap();
/// replacer.record_access(FrameId::new(1)).unwrap();
/// assert_eq!(replacer.evict(), Some(FrameId::new(0)));
/// ```
#[derive(Debug)]
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    capacity: usize,
    k: usize,
}

impl LruKReplacer {
    /// Create a replacer for frame ids `0..capacity` with history depth `k`.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(capacity: usize, k: usize) -> Self {
        assert!(k > 0, "k must be > 0");
        Self {
            state: Mutex::new(ReplacerState::default()),
            capacity,
            k,
        }
    }

    /// Record an access to `frame_id` at the current logical time.
    ///
    /// An unseen frame is registered and starts out evictable.
    ///
    /// # Errors
    /// `Error::InvalidFrameId` if `frame_id` is outside the capacity.
    pub fn record_access(&self, frame_id: FrameId) -> Result<()> {
        if frame_id.0 >= self.capacity {
            return Err(Error::InvalidFrameId(frame_id));
        }

        let mut state = self.state.lock();
        let timestamp = state.current_timestamp;
        state.current_timestamp += 1;

        let k = self.k;
        let mut registered = false;
        let node = state.nodes.entry(frame_id).or_insert_with(|| {
            registered = true;
            let mut node = LruKNode::new(k);
            node.is_evictable = true;
            node
        });
        node.record(timestamp, k);

        if registered {
            state.evictable_count += 1;
        }
        Ok(())
    }

    /// Mark a tracked frame evictable or pinned. Untracked frames are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get_mut(&frame_id) else {
            return;
        };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;

        if evictable {
            state.evictable_count += 1;
        } else {
            state.evictable_count -= 1;
        }
    }

    /// Pick a victim, forget its history, and return it.
    ///
    /// Returns `None` when no tracked frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.evictable_count == 0 {
            return None;
        }

        let now = state.current_timestamp;
        let victim = state
            .nodes
            .iter()
            .filter(|(_, node)| node.is_evictable)
            .max_by_key(|(_, node)| node.eviction_key(self.k, now))
            .map(|(&frame_id, _)| frame_id)?;

        state.nodes.remove(&victim);
        state.evictable_count -= 1;
        trace!(frame_id = %victim, "replacer chose victim");
        Some(victim)
    }

    /// Drop a frame's history entirely.
    ///
    /// Only evictable frames are removed; an untracked or pinned frame is
    /// left alone. Returns whether anything was removed.
    pub fn remove(&self, frame_id: FrameId) -> bool {
        let mut state = self.state.lock();
        let removable = state
            .nodes
            .get(&frame_id)
            .is_some_and(|node| node.is_evictable);
        if !removable {
            return false;
        }

        state.nodes.remove(&frame_id);
        state.evictable_count -= 1;
        true
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().evictable_count
    }

    /// `Some(evictable)` for a tracked frame, `None` otherwise.
    pub fn is_evictable(&self, frame_id: FrameId) -> Option<bool> {
        self.state
            .lock()
            .nodes
            .get(&frame_id)
            .map(|node| node.is_evictable)
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }
}
