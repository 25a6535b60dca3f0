//! The allocator contract consumed by the buffer cache.

use std::ops::Range;

use crate::error::Result;
use crate::node::{Extent, NodeId};

/// Placement strategy for [`RangeAllocator::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Smallest hole that fits; lowest address on ties.
    #[default]
    BestFit,

    /// Prefer the hole the last successful eviction scan freed up, then
    /// fall back to best fit.
    Evict,

    /// Lowest-addressed hole that fits.
    Low,
}

/// Parameters of one eviction scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanParams {
    /// Size of the extent the scan must make room for.
    pub size: u64,
    /// Required alignment of that extent (0 or 1 for none).
    pub alignment: u64,
    /// Opaque color carried alongside the request.
    pub color: u64,
    /// Only space inside this range counts towards a fit.
    pub range: Range<u64>,
    /// Placement strategy the follow-up insertion will use.
    pub mode: InsertMode,
}

impl ScanParams {
    /// Scan for `size` bytes anywhere in `range`, best-fit, uncolored.
    pub fn new(size: u64, alignment: u64, range: Range<u64>) -> Self {
        Self {
            size,
            alignment,
            color: 0,
            range,
            mode: InsertMode::BestFit,
        }
    }
}

/// A manager of extents inside a fixed address interval.
///
/// Besides plain insert/remove, implementors support a two-phase eviction
/// scan: after [`scan_init`](Self::scan_init), callers add allocated extents
/// one at a time with [`scan_add_block`](Self::scan_add_block) until it
/// reports that removing the extents added so far would make room for the
/// request. Every added extent must then be withdrawn with
/// [`scan_remove_block`](Self::scan_remove_block), which reports whether
/// that particular extent actually has to go.
///
/// Prefer driving the scan through [`EvictionScan`](crate::EvictionScan),
/// which guarantees the symmetric withdrawal.
pub trait RangeAllocator {
    /// Allocate an extent of `size` bytes anywhere in the managed interval.
    fn insert(
        &mut self,
        size: u64,
        alignment: u64,
        color: u64,
        mode: InsertMode,
    ) -> Result<NodeId> {
        let range = self.range();
        self.insert_in_range(size, alignment, color, range, mode)
    }

    /// Allocate an extent of `size` bytes lying entirely inside `range`.
    fn insert_in_range(
        &mut self,
        size: u64,
        alignment: u64,
        color: u64,
        range: Range<u64>,
        mode: InsertMode,
    ) -> Result<NodeId>;

    /// Release an extent, returning where it was placed.
    fn remove(&mut self, node: NodeId) -> Result<Extent>;

    /// Start a new eviction scan.
    fn scan_init(&mut self, params: ScanParams) -> Result<()>;

    /// Tentatively treat `node` as free. Returns true once a fit exists.
    fn scan_add_block(&mut self, node: NodeId) -> Result<bool>;

    /// Withdraw `node` from the scan. Returns true if it must be evicted.
    fn scan_remove_block(&mut self, node: NodeId) -> Result<bool>;

    /// Placement of a live extent.
    fn extent(&self, node: NodeId) -> Option<Extent>;

    /// The managed interval.
    fn range(&self) -> Range<u64>;

    /// Bytes currently allocated.
    fn used(&self) -> u64;

    /// The free span containing `offset`, if `offset` is not allocated.
    fn hole_at(&self, offset: u64) -> Option<Range<u64>>;

    /// Number of live extents.
    fn node_count(&self) -> usize;

    /// Check that every extent has been released before the allocator goes
    /// away.
    ///
    /// # Errors
    /// - `AllocError::NotClean` if extents are still allocated
    fn takedown(&mut self) -> Result<()>;
}
