//! Eviction policy for the buffer pool.
//!
//! - [`LruKReplacer`] - evicts the frame with the largest backward k-distance

mod lru_k;

pub use lru_k::LruKReplacer;
