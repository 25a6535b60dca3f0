//! Error types for the range manager.

use thiserror::Error;

use crate::node::NodeId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AllocError>;

/// All possible errors raised by a [`RangeAllocator`](crate::RangeAllocator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// No hole in the managed range can hold the request.
    #[error("no space for {size} bytes (alignment {alignment})")]
    NoSpace { size: u64, alignment: u64 },

    /// Extents must be at least one byte long.
    #[error("invalid extent size {0}")]
    InvalidSize(u64),

    /// Alignment must be zero, one or a power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(u64),

    /// The managed range wraps around the address space.
    #[error("range {start:#x}+{size:#x} overflows")]
    InvalidRange { start: u64, size: u64 },

    /// The handle does not name a live extent.
    #[error("unknown {0}")]
    UnknownNode(NodeId),

    /// Insert, remove and a new scan are refused while candidates are outstanding.
    #[error("eviction scan in progress")]
    ScanActive,

    /// A scan call was made without `scan_init`.
    #[error("no eviction scan in progress")]
    NoScanActive,

    /// The node was added to the current scan twice.
    #[error("{0} is already part of the eviction scan")]
    AlreadyScanned(NodeId),

    /// The node was withdrawn without having been added.
    #[error("{0} is not part of the eviction scan")]
    NotScanned(NodeId),

    /// The scan found no fit yet still claims a candidate is needed.
    ///
    /// This means the allocator broke its own contract.
    #[error("eviction scan found no fit but still requires {node}")]
    ScanInconsistent { node: NodeId },

    /// Takedown found extents that were never released.
    #[error("takedown with {nodes} extents still allocated")]
    NotClean { nodes: usize },
}

impl AllocError {
    /// Returns true if the request failed only for lack of free space.
    ///
    /// These are the failures an eviction can cure.
    pub fn is_no_space(&self) -> bool {
        matches!(self, Self::NoSpace { .. })
    }

    /// Returns true if the allocator's bookkeeping can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ScanInconsistent { .. })
    }
}
