//! Buffer registry - owner of every live buffer record.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::buffer::Buffer;
use crate::common::{BufferId, Error, Result};

/// The set of live buffers, indexed by identifier.
///
/// The registry owns the [`Buffer`] records. It knows nothing about
/// extents: releasing a buffer's backing storage before dropping the
/// record is the job of [`BufferPool::destroy`](super::BufferPool::destroy).
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: HashMap<BufferId, Buffer>,
}

impl BufferRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }

    /// Look up a buffer.
    pub fn find(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    /// Look up a buffer for modification.
    pub fn find_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }

    /// Look up a buffer, failing with `Error::UnknownBuffer`.
    pub fn get(&self, id: BufferId) -> Result<&Buffer> {
        self.find(id).ok_or(Error::UnknownBuffer(id))
    }

    /// Look up a buffer for modification, failing with `Error::UnknownBuffer`.
    pub fn get_mut(&mut self, id: BufferId) -> Result<&mut Buffer> {
        self.find_mut(id).ok_or(Error::UnknownBuffer(id))
    }

    /// Register a new buffer.
    ///
    /// The buffer starts with `WillNeed` advice, not in use and not paged in.
    ///
    /// # Errors
    /// - `Error::DuplicateBuffer` if `id` is already live; the existing
    ///   buffer is left untouched
    pub fn create(&mut self, id: BufferId, size: u64, pinned: bool) -> Result<&mut Buffer> {
        match self.buffers.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateBuffer(id)),
            Entry::Vacant(slot) => Ok(slot.insert(Buffer::new(id, size, pinned))),
        }
    }

    /// Drop a buffer record.
    pub fn remove(&mut self, id: BufferId) -> Option<Buffer> {
        self.buffers.remove(&id)
    }

    /// Check whether `id` is live.
    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    /// Identifiers of all live buffers, in no particular order.
    pub fn ids(&self) -> Vec<BufferId> {
        self.buffers.keys().copied().collect()
    }

    /// All live buffers, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.values()
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Check whether no buffer is live.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Advice;

    #[test]
    fn test_create_and_find() {
        let mut registry = BufferRegistry::new();
        let id = BufferId::new(0x1);

        let buf = registry.create(id, 1000, true).unwrap();
        assert_eq!(buf.size(), 1000);
        assert!(buf.is_pinned());

        assert!(registry.contains(id));
        assert_eq!(registry.find(id).unwrap().id(), id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_leaves_existing_untouched() {
        let mut registry = BufferRegistry::new();
        let id = BufferId::new(0x1);

        registry
            .create(id, 1000, false)
            .unwrap()
            .set_advice(Advice::DontNeed);

        let err = registry.create(id, 42, true).unwrap_err();
        assert!(matches!(err, Error::DuplicateBuffer(dup) if dup == id));

        let buf = registry.find(id).unwrap();
        assert_eq!(buf.size(), 1000);
        assert!(!buf.is_pinned());
        assert_eq!(buf.advice(), Advice::DontNeed);
    }

    #[test]
    fn test_unknown_buffer() {
        let mut registry = BufferRegistry::new();
        let id = BufferId::new(0xdead);

        assert!(registry.find(id).is_none());
        assert!(matches!(registry.get(id), Err(Error::UnknownBuffer(_))));
        assert!(matches!(registry.get_mut(id), Err(Error::UnknownBuffer(_))));
    }

    #[test]
    fn test_remove() {
        let mut registry = BufferRegistry::new();
        let id = BufferId::new(0x1);
        registry.create(id, 1000, false).unwrap();

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(id).is_none());

        // The identifier may be reused once destroyed
        assert!(registry.create(id, 10, false).is_ok());
    }
}
