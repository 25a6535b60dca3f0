//! Extent handles and placements.

use std::fmt;
use std::ops::Range;

/// Identifies one allocated extent in a [`RangeManager`](crate::RangeManager).
///
/// Handles are never reused, so a stale handle is always detected as
/// [`AllocError::UnknownNode`](crate::AllocError::UnknownNode).
///
/// # Example
/// ```
/// use cmapool_mm::NodeId;
///
/// let node = NodeId::new(7);
/// assert_eq!(node.0, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId.
    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// A contiguous byte range inside the managed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    /// First byte of the extent.
    pub start: u64,
    /// Length in bytes (never zero).
    pub size: u64,
}

impl Extent {
    /// Create a new extent.
    #[inline]
    pub fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    /// One past the last byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    /// The extent as a half-open range.
    #[inline]
    pub fn range(&self) -> Range<u64> {
        self.start..self.end()
    }

    /// Check whether two byte ranges share at least one byte.
    #[inline]
    pub fn overlaps(&self, other: &Range<u64>) -> bool {
        self.start < other.end && other.start < self.end()
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end())
    }
}
