//! Allocator doubles for tests.

use std::ops::Range;

use cmapool_mm::{Extent, InsertMode, NodeId, RangeAllocator, RangeManager, Result, ScanParams};

/// Allocator whose scan never fits but claims every block is required.
pub(crate) struct LyingAllocator {
    inner: RangeManager,
}

impl LyingAllocator {
    pub(crate) fn new(size: u64) -> Self {
        Self {
            inner: RangeManager::new(0, size).unwrap(),
        }
    }
}

impl RangeAllocator for LyingAllocator {
    fn insert_in_range(
        &mut self,
        size: u64,
        alignment: u64,
        color: u64,
        range: Range<u64>,
        mode: InsertMode,
    ) -> Result<NodeId> {
        self.inner.insert_in_range(size, alignment, color, range, mode)
    }

    fn remove(&mut self, node: NodeId) -> Result<Extent> {
        self.inner.remove(node)
    }

    fn scan_init(&mut self, _params: ScanParams) -> Result<()> {
        Ok(())
    }

    fn scan_add_block(&mut self, _node: NodeId) -> Result<bool> {
        Ok(false)
    }

    fn scan_remove_block(&mut self, _node: NodeId) -> Result<bool> {
        Ok(true)
    }

    fn extent(&self, node: NodeId) -> Option<Extent> {
        self.inner.extent(node)
    }

    fn range(&self) -> Range<u64> {
        self.inner.range()
    }

    fn used(&self) -> u64 {
        self.inner.used()
    }

    fn hole_at(&self, offset: u64) -> Option<Range<u64>> {
        self.inner.hole_at(offset)
    }

    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn takedown(&mut self) -> Result<()> {
        self.inner.takedown()
    }
}
