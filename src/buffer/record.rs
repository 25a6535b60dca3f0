//! Buffer - one buffer object of the log.
//!
//! A [`Buffer`] records what the log told us about a buffer object plus
//! where (if anywhere) its backing storage currently lives:
//! - Size and whether it may be moved at all
//! - Use count flag and madvise hint
//! - The extent handle while it is paged in

use std::fmt;

use cmapool_mm::NodeId;

use crate::common::BufferId;

/// madvise-style hint on whether a buffer's contents must be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Advice {
    /// The contents must be preserved.
    #[default]
    WillNeed,

    /// The contents may be discarded to reclaim memory.
    DontNeed,
}

impl Advice {
    /// Names accepted by the `madv` command.
    const NAMES: [(&'static str, Advice); 2] = [
        ("willneed", Advice::WillNeed),
        ("dontneed", Advice::DontNeed),
    ];

    /// Look up a hint by its log name.
    ///
    /// # Example
    /// ```
    /// use cmapool::buffer::Advice;
    ///
    /// assert_eq!(Advice::from_name("dontneed"), Some(Advice::DontNeed));
    /// assert_eq!(Advice::from_name("maybe"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, advice)| *advice)
    }

    /// The log name of this hint.
    pub fn name(&self) -> &'static str {
        match self {
            Advice::WillNeed => "willneed",
            Advice::DontNeed => "dontneed",
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A buffer object known to the pool.
///
/// Buffers are owned by the [`BufferRegistry`](super::BufferRegistry).
/// The MRU list and eviction scans refer to them by [`BufferId`] only.
///
/// A buffer is paged in exactly when it holds an extent handle; there is
/// no separate flag that could disagree with the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    /// Identifier from the log.
    id: BufferId,

    /// Requested extent size in bytes.
    size: u64,

    /// Never selected for eviction or purge.
    pinned: bool,

    /// Use count is held; never selected for eviction or purge.
    in_use: bool,

    /// Owner's hint about the contents.
    advice: Advice,

    /// Extent backing the buffer, if paged in.
    node: Option<NodeId>,
}

impl Buffer {
    /// Create a new buffer that is not paged in.
    pub fn new(id: BufferId, size: u64, pinned: bool) -> Self {
        Self {
            id,
            size,
            pinned,
            in_use: false,
            advice: Advice::WillNeed,
            node: None,
        }
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Set the use count flag. Returns the previous value.
    #[inline]
    pub fn set_in_use(&mut self, in_use: bool) -> bool {
        std::mem::replace(&mut self.in_use, in_use)
    }

    #[inline]
    pub fn advice(&self) -> Advice {
        self.advice
    }

    #[inline]
    pub fn set_advice(&mut self, advice: Advice) {
        self.advice = advice;
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Check whether the buffer currently holds an extent.
    #[inline]
    pub fn is_paged_in(&self) -> bool {
        self.node.is_some()
    }

    /// Extent handle, while paged in.
    #[inline]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Record the extent the buffer was placed in.
    pub(crate) fn attach(&mut self, node: NodeId) {
        debug_assert!(self.node.is_none(), "buffer {} already paged in", self.id);
        self.node = Some(node);
    }

    /// Forget the extent. Returns the handle it held.
    pub(crate) fn detach(&mut self) -> Option<NodeId> {
        self.node.take()
    }

    /// Check if the eviction scan may pick this buffer.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.is_paged_in() && !self.pinned && !self.in_use
    }

    /// Check if the buffer can be dropped without an eviction scan.
    #[inline]
    pub fn is_purgeable(&self) -> bool {
        self.is_evictable() && self.advice == Advice::DontNeed
    }
}
