//! Page buffers.
//!
//! - [`Page`] - The raw 4KB data container
//! - [`SharedPage`] - A page behind its reader/writer latch

#[allow(clippy::module_inception)]
mod page;

pub use page::{Page, SharedPage};
