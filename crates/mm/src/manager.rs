//! Best-fit range manager.
//!
//! The [`RangeManager`] hands out extents of a fixed interval
//! `[start, start + size)` and implements the two-phase eviction scan of
//! [`RangeAllocator`].

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::allocator::{InsertMode, RangeAllocator, ScanParams};
use crate::error::{AllocError, Result};
use crate::node::{Extent, NodeId};

/// One allocated extent.
#[derive(Debug, Clone)]
struct Node {
    extent: Extent,
    color: u64,
    /// Currently treated as free by the active scan.
    scanned: bool,
}

/// State of an eviction scan between `scan_init` and the last withdrawal.
#[derive(Debug)]
struct ScanState {
    params: ScanParams,
    /// Candidates added and not yet withdrawn.
    outstanding: usize,
    /// Placement proven feasible, once found.
    hit: Option<Range<u64>>,
}

/// Manages extents inside a fixed address interval.
///
/// # Layout
/// ```text
///   start                                                   start + size
///   ┌────────┬──────────┬────────┬───────────────┬──────────┐
///   │ node A │   hole   │ node B │     hole      │  node C  │
///   └────────┴──────────┴────────┴───────────────┴──────────┘
///   by_offset: A.start → A, B.start → B, C.start → C
/// ```
///
/// Holes are never stored; they are derived from the gaps between
/// consecutive entries of `by_offset`.
///
/// # Eviction Scan
/// While a scan is in progress, added nodes are treated as free space. Each
/// addition checks the contiguous span around the added node, bounded by the
/// nearest non-scanned neighbours and the scan range. The first span that
/// can hold the aligned request becomes the *hit*; withdrawing a node then
/// reports whether it overlaps the hit.
#[derive(Debug)]
pub struct RangeManager {
    /// First managed byte.
    start: u64,

    /// Number of managed bytes.
    size: u64,

    /// All live extents by handle.
    nodes: HashMap<NodeId, Node>,

    /// Start offset → handle, ordered by address.
    by_offset: BTreeMap<u64, NodeId>,

    /// Next handle to give out (never reused).
    next_id: u64,

    /// Sum of live extent sizes.
    used: u64,

    /// Scan in progress, if any.
    scan: Option<ScanState>,

    /// Range freed up by the last feasible scan, consumed by `InsertMode::Evict`.
    last_hit: Option<Range<u64>>,
}

impl RangeManager {
    /// Create a manager for `[start, start + size)`.
    ///
    /// # Errors
    /// - `AllocError::InvalidSize` if `size` is 0
    /// - `AllocError::InvalidRange` if the interval overflows `u64`
    pub fn new(start: u64, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(AllocError::InvalidSize(size));
        }
        if start.checked_add(size).is_none() {
            return Err(AllocError::InvalidRange { start, size });
        }

        Ok(Self {
            start,
            size,
            nodes: HashMap::new(),
            by_offset: BTreeMap::new(),
            next_id: 0,
            used: 0,
            scan: None,
            last_hit: None,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of managed bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Color given to an extent at insertion.
    pub fn color(&self, node: NodeId) -> Option<u64> {
        self.nodes.get(&node).map(|n| n.color)
    }

    /// Check whether an eviction scan still has outstanding candidates.
    pub fn scan_in_progress(&self) -> bool {
        self.scan.as_ref().is_some_and(|s| s.outstanding > 0)
    }

    /// All holes in address order.
    pub fn holes(&self) -> Vec<Range<u64>> {
        let mut holes = Vec::new();
        let mut cursor = self.start;

        for id in self.by_offset.values() {
            let ext = self.nodes[id].extent;
            if ext.start > cursor {
                holes.push(cursor..ext.start);
            }
            cursor = ext.end();
        }

        let end = self.start + self.size;
        if end > cursor {
            holes.push(cursor..end);
        }

        holes
    }

    /// Extents in address order.
    pub fn extents(&self) -> impl Iterator<Item = (NodeId, Extent)> + '_ {
        self.by_offset
            .values()
            .map(move |id| (*id, self.nodes[id].extent))
    }

    // ========================================================================
    // Internal: placement
    // ========================================================================

    fn check_request(size: u64, alignment: u64) -> Result<()> {
        if size == 0 {
            return Err(AllocError::InvalidSize(size));
        }
        if alignment > 1 && !alignment.is_power_of_two() {
            return Err(AllocError::InvalidAlignment(alignment));
        }
        Ok(())
    }

    /// Lowest aligned offset in `hole` that can hold `size` bytes.
    fn fit(hole: &Range<u64>, size: u64, alignment: u64) -> Option<u64> {
        let start = align_up(hole.start, alignment)?;
        let end = start.checked_add(size)?;
        (end <= hole.end).then_some(start)
    }

    /// Holes clipped to `range`, in address order.
    fn holes_in(&self, range: &Range<u64>) -> Vec<Range<u64>> {
        self.holes()
            .into_iter()
            .map(|hole| hole.start.max(range.start)..hole.end.min(range.end))
            .filter(|hole| hole.start < hole.end)
            .collect()
    }

    fn find_best_fit(&self, size: u64, alignment: u64, range: &Range<u64>) -> Option<u64> {
        let mut best: Option<(u64, u64)> = None;

        for hole in self.holes_in(range) {
            if let Some(offset) = Self::fit(&hole, size, alignment) {
                let hole_len = hole.end - hole.start;
                // Strict comparison keeps the lowest address on ties
                if best.map_or(true, |(len, _)| hole_len < len) {
                    best = Some((hole_len, offset));
                }
            }
        }

        best.map(|(_, offset)| offset)
    }

    fn find_low(&self, size: u64, alignment: u64, range: &Range<u64>) -> Option<u64> {
        self.holes_in(range)
            .iter()
            .find_map(|hole| Self::fit(hole, size, alignment))
    }

    fn is_free(&self, range: &Range<u64>) -> bool {
        range.start >= self.start
            && range.end <= self.start + self.size
            && !self
                .by_offset
                .range(..range.end)
                .any(|(_, id)| self.nodes[id].extent.overlaps(range))
    }

    fn find_in_last_hit(&mut self, size: u64, alignment: u64, range: &Range<u64>) -> Option<u64> {
        let hit = self.last_hit.take()?;
        if !self.is_free(&hit) {
            return None;
        }
        let hit = hit.start.max(range.start)..hit.end.min(range.end);
        (hit.start < hit.end)
            .then(|| Self::fit(&hit, size, alignment))
            .flatten()
    }

    /// Nearest end of a non-scanned extent at or below `offset`.
    fn left_bound(&self, offset: u64) -> u64 {
        self.by_offset
            .range(..offset)
            .rev()
            .map(|(_, id)| &self.nodes[id])
            .find(|n| !n.scanned)
            .map_or(self.start, |n| n.extent.end())
    }

    /// Nearest start of a non-scanned extent at or above `offset`.
    fn right_bound(&self, offset: u64) -> u64 {
        self.by_offset
            .range(offset..)
            .map(|(_, id)| &self.nodes[id])
            .find(|n| !n.scanned)
            .map_or(self.start + self.size, |n| n.extent.start)
    }
}

impl RangeAllocator for RangeManager {
    fn insert_in_range(
        &mut self,
        size: u64,
        alignment: u64,
        color: u64,
        range: Range<u64>,
        mode: InsertMode,
    ) -> Result<NodeId> {
        Self::check_request(size, alignment)?;
        if self.scan_in_progress() {
            return Err(AllocError::ScanActive);
        }

        let offset = match mode {
            InsertMode::BestFit => self.find_best_fit(size, alignment, &range),
            InsertMode::Low => self.find_low(size, alignment, &range),
            InsertMode::Evict => self
                .find_in_last_hit(size, alignment, &range)
                .or_else(|| self.find_best_fit(size, alignment, &range)),
        }
        .ok_or(AllocError::NoSpace { size, alignment })?;

        let id = NodeId::new(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            Node {
                extent: Extent::new(offset, size),
                color,
                scanned: false,
            },
        );
        self.by_offset.insert(offset, id);
        self.used += size;
        self.last_hit = None;

        Ok(id)
    }

    fn remove(&mut self, node: NodeId) -> Result<Extent> {
        if self.scan_in_progress() {
            return Err(AllocError::ScanActive);
        }

        let removed = self
            .nodes
            .remove(&node)
            .ok_or(AllocError::UnknownNode(node))?;

        self.by_offset.remove(&removed.extent.start);
        self.used -= removed.extent.size;

        Ok(removed.extent)
    }

    fn scan_init(&mut self, params: ScanParams) -> Result<()> {
        Self::check_request(params.size, params.alignment)?;
        if self.scan_in_progress() {
            return Err(AllocError::ScanActive);
        }

        self.last_hit = None;
        self.scan = Some(ScanState {
            params,
            outstanding: 0,
            hit: None,
        });

        Ok(())
    }

    fn scan_add_block(&mut self, node: NodeId) -> Result<bool> {
        let scan = self.scan.as_ref().ok_or(AllocError::NoScanActive)?;
        let found = scan.hit.is_some();
        let params = scan.params.clone();

        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(AllocError::UnknownNode(node))?;
        if entry.scanned {
            return Err(AllocError::AlreadyScanned(node));
        }
        entry.scanned = true;
        let extent = entry.extent;

        let hit = if found {
            None
        } else {
            let left = self.left_bound(extent.start).max(params.range.start);
            let right = self.right_bound(extent.end()).min(params.range.end);
            (left < right)
                .then(|| Self::fit(&(left..right), params.size, params.alignment))
                .flatten()
                .map(|offset| offset..offset + params.size)
        };

        let scan = self.scan.as_mut().ok_or(AllocError::NoScanActive)?;
        scan.outstanding += 1;
        if hit.is_some() {
            scan.hit = hit;
        }

        Ok(scan.hit.is_some())
    }

    fn scan_remove_block(&mut self, node: NodeId) -> Result<bool> {
        let scan = self.scan.as_mut().ok_or(AllocError::NoScanActive)?;
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(AllocError::UnknownNode(node))?;
        if !entry.scanned {
            return Err(AllocError::NotScanned(node));
        }
        entry.scanned = false;

        let required = scan
            .hit
            .as_ref()
            .is_some_and(|hit| entry.extent.overlaps(hit));

        scan.outstanding -= 1;
        if scan.outstanding == 0 {
            self.last_hit = scan.hit.take();
            self.scan = None;
        }

        Ok(required)
    }

    fn extent(&self, node: NodeId) -> Option<Extent> {
        self.nodes.get(&node).map(|n| n.extent)
    }

    fn range(&self) -> Range<u64> {
        self.start..self.start + self.size
    }

    fn used(&self) -> u64 {
        self.used
    }

    fn hole_at(&self, offset: u64) -> Option<Range<u64>> {
        self.holes()
            .into_iter()
            .find(|hole| hole.contains(&offset))
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn takedown(&mut self) -> Result<()> {
        if self.nodes.is_empty() {
            Ok(())
        } else {
            Err(AllocError::NotClean {
                nodes: self.nodes.len(),
            })
        }
    }
}

/// Round `value` up to a multiple of `alignment` (0 and 1 mean unaligned).
fn align_up(value: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        return Some(value);
    }
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}
