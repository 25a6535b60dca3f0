//! MRU list - recency order of paged-in buffers.
//!
//! Used by the eviction scan to visit buffers least-recently-used first.

use std::collections::HashMap;

use crate::common::BufferId;

/// Neighbours of one entry in the list.
#[derive(Debug, Clone, Copy, Default)]
struct Link {
    /// Towards the head (more recently used).
    prev: Option<BufferId>,
    /// Towards the tail (less recently used).
    next: Option<BufferId>,
}

/// A doubly-linked recency list keyed by buffer id.
///
/// ```text
///   head (MRU)                                 tail (LRU)
///   ┌─────┐ next ┌─────┐ next ┌─────┐ next ┌─────┐
///   │  C  │─────▶│  A  │─────▶│  D  │─────▶│  B  │
///   │     │◀─────│     │◀─────│     │◀─────│     │
///   └─────┘ prev └─────┘ prev └─────┘ prev └─────┘
/// ```
///
/// Links live in a map rather than in the buffers themselves, so the list
/// never holds a reference to a [`Buffer`](crate::buffer::Buffer). Promote
/// and remove are O(1).
#[derive(Debug, Default)]
pub struct MruList {
    links: HashMap<BufferId, Link>,
    head: Option<BufferId>,
    tail: Option<BufferId>,
}

impl MruList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Move `id` to the head, inserting it if absent.
    pub fn promote(&mut self, id: BufferId) {
        if self.head == Some(id) {
            return;
        }

        self.unlink(id);

        let old_head = self.head;
        self.links.insert(
            id,
            Link {
                prev: None,
                next: old_head,
            },
        );

        match old_head {
            Some(h) => {
                if let Some(link) = self.links.get_mut(&h) {
                    link.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    /// Take `id` out of the list. Returns false if it wasn't there.
    pub fn remove(&mut self, id: BufferId) -> bool {
        self.unlink(id)
    }

    /// Check whether `id` is tracked.
    pub fn contains(&self, id: BufferId) -> bool {
        self.links.contains_key(&id)
    }

    /// Most recently used entry.
    pub fn head(&self) -> Option<BufferId> {
        self.head
    }

    /// Least recently used entry.
    pub fn tail(&self) -> Option<BufferId> {
        self.tail
    }

    /// Number of tracked buffers.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Walk from the tail, least recently used first.
    pub fn iter_lru(&self) -> LruIter<'_> {
        LruIter {
            list: self,
            cursor: self.tail,
        }
    }

    /// Entries from the head, most recently used first.
    pub fn to_vec(&self) -> Vec<BufferId> {
        let mut order: Vec<BufferId> = self.iter_lru().collect();
        order.reverse();
        order
    }

    fn unlink(&mut self, id: BufferId) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };

        match link.prev {
            Some(p) => {
                if let Some(prev) = self.links.get_mut(&p) {
                    prev.next = link.next;
                }
            }
            None => self.head = link.next,
        }

        match link.next {
            Some(n) => {
                if let Some(next) = self.links.get_mut(&n) {
                    next.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }

        true
    }
}

/// Iterator over an [`MruList`] from the least recently used end.
pub struct LruIter<'a> {
    list: &'a MruList,
    cursor: Option<BufferId>,
}

impl Iterator for LruIter<'_> {
    type Item = BufferId;

    fn next(&mut self) -> Option<BufferId> {
        let current = self.cursor?;
        self.cursor = self.list.links.get(&current).and_then(|link| link.prev);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> BufferId {
        BufferId::new(n)
    }

    #[test]
    fn test_promote_orders_by_recency() {
        let mut mru = MruList::new();

        mru.promote(id(1));
        mru.promote(id(2));
        mru.promote(id(3));

        assert_eq!(mru.len(), 3);
        assert_eq!(mru.head(), Some(id(3)));
        assert_eq!(mru.tail(), Some(id(1)));
        assert_eq!(mru.iter_lru().collect::<Vec<_>>(), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn test_promote_existing_moves_to_head() {
        let mut mru = MruList::new();

        mru.promote(id(1));
        mru.promote(id(2));
        mru.promote(id(3));

        // Touch the LRU entry
        mru.promote(id(1));
        assert_eq!(mru.to_vec(), vec![id(1), id(3), id(2)]);

        // Touch a middle entry
        mru.promote(id(3));
        assert_eq!(mru.to_vec(), vec![id(3), id(1), id(2)]);

        // Touch the head - no change
        mru.promote(id(3));
        assert_eq!(mru.to_vec(), vec![id(3), id(1), id(2)]);
        assert_eq!(mru.len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut mru = MruList::new();

        mru.promote(id(1));
        mru.promote(id(2));
        mru.promote(id(3));

        assert!(mru.remove(id(2)));
        assert_eq!(mru.to_vec(), vec![id(3), id(1)]);

        assert!(mru.remove(id(3)));
        assert_eq!(mru.head(), Some(id(1)));
        assert_eq!(mru.tail(), Some(id(1)));

        assert!(mru.remove(id(1)));
        assert!(mru.is_empty());
        assert_eq!(mru.head(), None);
        assert_eq!(mru.tail(), None);

        // Absent entries are reported, not a panic
        assert!(!mru.remove(id(1)));
    }

    #[test]
    fn test_iter_lru_empty() {
        let mru = MruList::new();
        assert_eq!(mru.iter_lru().next(), None);
    }

    #[test]
    fn test_contains() {
        let mut mru = MruList::new();
        mru.promote(id(7));

        assert!(mru.contains(id(7)));
        assert!(!mru.contains(id(8)));
    }
}
