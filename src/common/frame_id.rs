//! Frame identifier type.

use std::fmt;

/// Index of a slot in the buffer pool's frame arena.
///
/// Distinct from [`PageId`](super::PageId): a frame is physical and reused,
/// a page id is logical and never reused. `usize` so it indexes the
/// `Vec<Frame>` directly: `frames[frame_id.0]`.
///
/// # Example
/// ```
/// use pagepool::FrameId;
///
/// let frame_id = FrameId::new(5);
/// assert_eq!(frame_id.0, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}
