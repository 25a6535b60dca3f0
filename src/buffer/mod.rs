//! Buffer pool management.
//!
//! The buffer pool decides which buffer objects hold an extent of the
//! simulated CMA pool. Buffers that lose their extent stay registered and
//! are paged back in on their next `use`.
//!
//! # Components
//! - [`BufferPool`] - Admission, purge and eviction policy
//! - [`Buffer`] - One buffer object and its flags
//! - [`BufferRegistry`] - Every live buffer, by id
//! - [`PoolStats`] - Performance statistics
//! - [`replacer`] - Recency tracking for eviction

mod pool;
mod record;
mod registry;
pub mod replacer;
mod stats;
#[cfg(test)]
pub(crate) mod testing;

pub use pool::BufferPool;
pub use record::{Advice, Buffer};
pub use registry::BufferRegistry;
pub use stats::{PoolStats, StatsSnapshot};
