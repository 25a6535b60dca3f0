//! Range manager for a fixed address interval.
//!
//! This crate provides the allocator that backs the CMA pool simulation:
//!
//! # Types
//! - [`RangeAllocator`] - The contract consumed by the buffer cache
//! - [`RangeManager`] - Best-fit implementation of that contract
//! - [`EvictionScan`] - Scoped guard around the two-phase scan protocol
//! - [`NodeId`] / [`Extent`] - Handles and placements of allocated extents
//!
//! # Error Handling
//! - [`AllocError`] - Unified error type
//! - [`Result<T>`] - Convenient result alias
//!
//! # Example
//! ```
//! use cmapool_mm::{InsertMode, RangeAllocator, RangeManager};
//!
//! let mut mm = RangeManager::new(0, 2000).unwrap();
//! let node = mm.insert(1000, 0, 0, InsertMode::BestFit).unwrap();
//!
//! assert_eq!(mm.extent(node).unwrap().start, 0);
//! assert_eq!(mm.used(), 1000);
//! ```

pub mod allocator;
pub mod error;
pub mod manager;
pub mod node;
pub mod scan;

pub use allocator::{InsertMode, RangeAllocator, ScanParams};
pub use error::{AllocError, Result};
pub use manager::RangeManager;
pub use node::{Extent, NodeId};
pub use scan::{EvictionScan, ScanOutcome};
