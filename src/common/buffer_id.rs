//! Buffer identifier type.

use std::fmt;

/// Identifies a buffer object in the log.
///
/// The log names buffers by the kernel address of their buffer object, so
/// the identifier is only meaningful while the buffer is live: the same
/// address may be reused for a new buffer after `destroy`.
///
/// # Example
/// ```
/// use cmapool::BufferId;
///
/// let id = BufferId::new(0x8f3a2c00);
/// assert_eq!(id.0, 0x8f3a2c00);
/// assert_eq!(id.to_string(), "8f3a2c00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl BufferId {
    /// Create a new BufferId.
    #[inline]
    pub fn new(id: u32) -> Self {
        BufferId(id)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
