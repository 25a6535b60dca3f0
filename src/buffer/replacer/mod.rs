//! Recency tracking for the eviction policy.
//!
//! Currently implements:
//! - [`MruList`] - Most-recently-used ordering of paged-in buffers

mod mru;

pub use mru::{LruIter, MruList};
