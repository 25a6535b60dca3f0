//! Scoped eviction scan.
//!
//! [`EvictionScan`] wraps the `scan_init` / `scan_add_block` /
//! `scan_remove_block` handshake of a [`RangeAllocator`] so that every
//! candidate added to the scan is withdrawn exactly once, whether the scan
//! is committed or simply dropped on an early return.

use crate::allocator::{RangeAllocator, ScanParams};
use crate::error::{AllocError, Result};
use crate::node::NodeId;

/// Result of committing an [`EvictionScan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome<K> {
    /// A fit was found; these candidates must be evicted to reach it.
    Evict(Vec<K>),

    /// The candidates offered were not enough to make room.
    Infeasible,
}

/// An eviction scan in progress.
///
/// Each candidate carries a caller-supplied key `K` (for instance the id of
/// the buffer owning the extent) which is handed back for the candidates
/// that turn out to be required.
///
/// # Example
/// ```
/// use cmapool_mm::{EvictionScan, InsertMode, RangeAllocator, RangeManager, ScanOutcome, ScanParams};
///
/// let mut mm = RangeManager::new(0, 2000).unwrap();
/// let victim = mm.insert(1000, 0, 0, InsertMode::BestFit).unwrap();
///
/// let params = ScanParams::new(1500, 0, mm.range());
/// let mut scan = EvictionScan::begin(&mut mm, params).unwrap();
/// assert!(scan.add(victim, "victim").unwrap());
///
/// assert_eq!(scan.commit().unwrap(), ScanOutcome::Evict(vec!["victim"]));
/// ```
pub struct EvictionScan<'a, A: RangeAllocator + ?Sized, K> {
    allocator: &'a mut A,
    candidates: Vec<(NodeId, K)>,
    feasible: bool,
}

impl<'a, A: RangeAllocator + ?Sized, K> EvictionScan<'a, A, K> {
    /// Start a scan on `allocator`.
    ///
    /// # Errors
    /// Whatever the allocator's `scan_init` rejects.
    pub fn begin(allocator: &'a mut A, params: ScanParams) -> Result<Self> {
        allocator.scan_init(params)?;

        Ok(Self {
            allocator,
            candidates: Vec::new(),
            feasible: false,
        })
    }

    /// Offer one more candidate. Returns true once a fit exists.
    ///
    /// Callers should stop adding candidates as soon as this returns true.
    pub fn add(&mut self, node: NodeId, key: K) -> Result<bool> {
        let feasible = self.allocator.scan_add_block(node)?;
        self.candidates.push((node, key));
        self.feasible = feasible;
        Ok(feasible)
    }

    /// Check whether the candidates added so far make room.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    /// Number of candidates added.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check whether no candidate was added.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Withdraw every candidate and report which ones must be evicted.
    ///
    /// All candidates are withdrawn even if one of the withdrawals fails;
    /// the first failure is returned afterwards.
    ///
    /// # Errors
    /// - `AllocError::ScanInconsistent` if the scan found no fit but a
    ///   withdrawal still claims its candidate is required
    /// - Any error of the allocator's `scan_remove_block`
    pub fn commit(mut self) -> Result<ScanOutcome<K>> {
        let candidates = std::mem::take(&mut self.candidates);
        let mut required = Vec::new();
        let mut first_err = None;

        for (node, key) in candidates {
            match self.allocator.scan_remove_block(node) {
                Ok(true) if self.feasible => required.push(key),
                Ok(true) => {
                    if first_err.is_none() {
                        first_err = Some(AllocError::ScanInconsistent { node });
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_err {
            return Err(err);
        }

        if self.feasible {
            Ok(ScanOutcome::Evict(required))
        } else {
            Ok(ScanOutcome::Infeasible)
        }
    }
}

impl<A: RangeAllocator + ?Sized, K> Drop for EvictionScan<'_, A, K> {
    fn drop(&mut self) {
        for (node, _) in self.candidates.drain(..) {
            let _ = self.allocator.scan_remove_block(node);
        }
    }
}
