//! Buffer Pool - the CMA admission and eviction policy.
//!
//! The [`BufferPool`] provides:
//! - Buffer lifecycle (create, destroy, use count, madvise hints)
//! - Page-in with a purge and LRU eviction fallback
//! - Pairing of every extent release with its MRU removal

use cmapool_mm::{
    EvictionScan, Extent, InsertMode, RangeAllocator, RangeManager, ScanOutcome, ScanParams,
};
use tracing::{debug, trace};

use crate::buffer::replacer::MruList;
use crate::buffer::{Advice, Buffer, BufferRegistry, PoolStats};
use crate::common::{BufferId, Error, PoolConfig, Result};

/// The simulated CMA pool and the buffers competing for it.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                        BufferPool                           │
/// │  ┌──────────────┐            ┌──────────────────────────┐   │
/// │  │   registry   │  owns      │  allocator: RangeManager │   │
/// │  │ Id → Buffer  │──node id──▶│  [ext][hole][ext][ext]   │   │
/// │  └──────────────┘            └──────────────────────────┘   │
/// │  ┌──────────────┐            ┌──────────────┐               │
/// │  │     mru      │            │    stats     │               │
/// │  │  head … tail │            │   counters   │               │
/// │  └──────────────┘            └──────────────┘               │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// The registry is the only owner of buffer records; the MRU list holds
/// identifiers. A buffer is in the MRU list exactly while it holds an
/// extent, and every path that releases an extent also drops the MRU entry.
///
/// # Page-in
/// A buffer that needs backing storage goes down a ladder, stopping at the
/// first rung that succeeds:
/// 1. Best-fit insertion.
/// 2. Purge every evictable `DontNeed` buffer, then retry 1.
/// 3. Eviction scan from the LRU end, evict the buffers the scan needs,
///    then insert into the freed space.
///
/// If all three fail the buffer stays registered but not paged in.
///
/// # Usage
/// ```
/// use cmapool::{BufferId, BufferPool, PoolConfig};
///
/// let mut pool = BufferPool::new(PoolConfig::new(2000).with_alignment(1)).unwrap();
///
/// pool.create(BufferId::new(1), 1000, false).unwrap();
/// pool.create(BufferId::new(2), 1500, false).unwrap();
///
/// // Buffer 1 was evicted to make room
/// assert!(!pool.is_paged_in(BufferId::new(1)));
/// assert!(pool.is_paged_in(BufferId::new(2)));
/// ```
pub struct BufferPool<A: RangeAllocator = RangeManager> {
    /// Every live buffer.
    registry: BufferRegistry,

    /// Paged-in buffers by recency.
    mru: MruList,

    /// Address space of the pool.
    allocator: A,

    /// Settings (immutable after construction).
    config: PoolConfig,

    /// Performance statistics.
    stats: PoolStats,
}

impl BufferPool<RangeManager> {
    /// Create a pool managing `[0, config.pool_size)`.
    ///
    /// # Errors
    /// - `Error::Config` if the config doesn't validate
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let allocator = RangeManager::new(0, config.pool_size)?;
        Ok(Self::with_allocator(config, allocator))
    }
}

impl<A: RangeAllocator> BufferPool<A> {
    /// Create a pool on top of an existing allocator.
    pub fn with_allocator(config: PoolConfig, allocator: A) -> Self {
        Self {
            registry: BufferRegistry::new(),
            mru: MruList::new(),
            allocator,
            config,
            stats: PoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Buffer lifecycle
    // ========================================================================

    /// Register a buffer and page it in.
    ///
    /// # Errors
    /// - `Error::DuplicateBuffer` if `id` is already live (nothing changes)
    /// - `Error::OutOfMemory` if no room could be made; the buffer is still
    ///   registered, just not paged in
    pub fn create(&mut self, id: BufferId, size: u64, pinned: bool) -> Result<()> {
        self.registry.create(id, size, pinned)?;
        debug!(buffer = %id, size, pinned, "created buffer");

        self.page_in(id)
    }

    /// Release a buffer's extent (if any) and drop its record.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    pub fn destroy(&mut self, id: BufferId) -> Result<()> {
        self.release(id)?;
        self.registry.remove(id);
        debug!(buffer = %id, "destroyed buffer");

        Ok(())
    }

    /// Destroy every live buffer.
    ///
    /// Keeps going past failures and returns the first one.
    pub fn destroy_all(&mut self) -> Result<()> {
        let mut first_err = None;

        for id in self.registry.ids() {
            if let Err(e) = self.destroy(id) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Mark a buffer as in use, keeping it away from purge and eviction.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    /// - `Error::AlreadyInUse` if the flag was already set (it stays set)
    pub fn add_usecnt(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get_mut(id)?;

        if buffer.set_in_use(true) {
            return Err(Error::AlreadyInUse(id));
        }

        Ok(())
    }

    /// Clear a buffer's in-use flag.
    ///
    /// With compaction enabled, the buffer then slides down to the end of
    /// the extent below it.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    /// - `Error::NotInUse` if the flag was already clear (it stays clear)
    pub fn remove_usecnt(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get_mut(id)?;

        if !buffer.set_in_use(false) {
            return Err(Error::NotInUse(id));
        }

        if self.config.compact {
            self.compact(id)?;
        }

        Ok(())
    }

    /// Record an access to a buffer, paging it in if needed.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    /// - `Error::OutOfMemory` if it had to be paged in and couldn't be
    pub fn use_buffer(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get(id)?;

        if buffer.is_paged_in() {
            PoolStats::bump(&self.stats.use_hits);
            self.mru.promote(id);
            return Ok(());
        }

        PoolStats::bump(&self.stats.use_misses);
        self.page_in(id)
    }

    /// Set a buffer's madvise hint.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    pub fn set_advice(&mut self, id: BufferId, advice: Advice) -> Result<()> {
        self.registry.get_mut(id)?.set_advice(advice);
        Ok(())
    }

    // ========================================================================
    // Public API: Admission and eviction
    // ========================================================================

    /// Give a buffer backing storage, reclaiming memory if needed.
    ///
    /// A buffer that is already paged in is just promoted.
    ///
    /// # Errors
    /// - `Error::UnknownBuffer` if `id` is not live
    /// - `Error::OutOfMemory` if direct insertion, purge and eviction all
    ///   failed; the buffer is left not paged in
    /// - `Error::Alloc` for allocator faults (fatal ones included)
    pub fn page_in(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get(id)?;
        if buffer.is_paged_in() {
            self.mru.promote(id);
            return Ok(());
        }
        let size = buffer.size();

        if self.try_insert(id, size, InsertMode::BestFit)? {
            PoolStats::bump(&self.stats.direct_hits);
            return Ok(());
        }

        if self.purge()? > 0 && self.try_insert(id, size, InsertMode::BestFit)? {
            PoolStats::bump(&self.stats.reclaim_hits);
            return Ok(());
        }

        if self.evict_for(size)? && self.try_insert(id, size, InsertMode::Evict)? {
            PoolStats::bump(&self.stats.reclaim_hits);
            return Ok(());
        }

        PoolStats::bump(&self.stats.failures);
        debug!(buffer = %id, size, used = self.allocator.used(), "page-in failed");
        Err(Error::OutOfMemory { id, size })
    }

    /// Drop every paged-in buffer whose owner said it doesn't need the
    /// contents. Returns how many were dropped.
    ///
    /// Pinned and in-use buffers are never purged.
    pub fn purge(&mut self) -> Result<usize> {
        let victims: Vec<BufferId> = self
            .mru
            .iter_lru()
            .filter(|id| self.registry.find(*id).is_some_and(Buffer::is_purgeable))
            .collect();

        for &id in &victims {
            self.release(id)?;
            PoolStats::bump(&self.stats.purged);
            trace!(buffer = %id, "purged dontneed buffer");
        }

        if !victims.is_empty() {
            debug!(count = victims.len(), "purge reclaimed buffers");
        }

        Ok(victims.len())
    }

    /// Run an eviction scan for `size` bytes and evict the buffers it
    /// needs. Returns false if no set of evictable buffers makes room.
    fn evict_for(&mut self, size: u64) -> Result<bool> {
        PoolStats::bump(&self.stats.scans);

        let params = ScanParams::new(size, self.config.alignment, self.allocator.range());
        let mut scan = EvictionScan::begin(&mut self.allocator, params)?;

        for id in self.mru.iter_lru() {
            let Some(buffer) = self.registry.find(id) else {
                continue;
            };
            if !buffer.is_evictable() {
                continue;
            }
            let Some(node) = buffer.node() else {
                continue;
            };

            if scan.add(node, id)? {
                break;
            }
        }

        let candidates = scan.len();
        match scan.commit()? {
            ScanOutcome::Infeasible => {
                debug!(size, candidates, "eviction scan found no fit");
                Ok(false)
            }
            ScanOutcome::Evict(victims) => {
                debug!(size, candidates, victims = victims.len(), "eviction scan found a fit");

                for id in victims {
                    self.release(id)?;
                    PoolStats::bump(&self.stats.evicted);
                    trace!(buffer = %id, "evicted buffer");
                }

                Ok(true)
            }
        }
    }

    // ========================================================================
    // Public API: Teardown
    // ========================================================================

    /// Destroy every buffer and check that the pool is empty.
    ///
    /// # Errors
    /// - The first failure of [`destroy_all`](Self::destroy_all)
    /// - `AllocError::NotClean` if extents outlive their buffers
    pub fn shutdown(mut self) -> Result<()> {
        self.destroy_all()?;
        self.allocator.takedown()?;
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Get the pool settings.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the underlying allocator.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Look up a buffer.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.registry.find(id)
    }

    /// All live buffers, in no particular order.
    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.registry.iter()
    }

    /// Check whether a buffer holds an extent (false for unknown ids).
    pub fn is_paged_in(&self, id: BufferId) -> bool {
        self.registry.find(id).is_some_and(Buffer::is_paged_in)
    }

    /// Where a buffer currently lives.
    pub fn extent_of(&self, id: BufferId) -> Option<Extent> {
        self.registry
            .find(id)
            .and_then(Buffer::node)
            .and_then(|node| self.allocator.extent(node))
    }

    /// Check whether a buffer is tracked by the MRU list.
    pub fn is_tracked(&self, id: BufferId) -> bool {
        self.mru.contains(id)
    }

    /// Paged-in buffers, most recently used first.
    pub fn mru_order(&self) -> Vec<BufferId> {
        self.mru.to_vec()
    }

    /// Bytes held by paged-in buffers.
    pub fn used_bytes(&self) -> u64 {
        self.allocator.used()
    }

    /// Number of paged-in buffers.
    pub fn paged_in_count(&self) -> usize {
        self.mru.len()
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Internal: Extent management
    // ========================================================================

    /// Insert an extent for `id`. Returns false if there was no room.
    fn try_insert(&mut self, id: BufferId, size: u64, mode: InsertMode) -> Result<bool> {
        let node = match self.allocator.insert(size, self.config.alignment, 0, mode) {
            Ok(node) => node,
            Err(e) if e.is_no_space() => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        match self.registry.find_mut(id) {
            Some(buffer) => buffer.attach(node),
            None => {
                self.allocator.remove(node)?;
                return Err(Error::UnknownBuffer(id));
            }
        }
        self.mru.promote(id);
        PoolStats::bump(&self.stats.page_ins);
        trace!(buffer = %id, size, ?mode, "paged in");

        Ok(true)
    }

    /// Take a buffer's extent away, together with its MRU entry.
    ///
    /// No-op for buffers that are not paged in.
    fn release(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get_mut(id)?;

        if let Some(node) = buffer.node() {
            self.allocator.remove(node)?;
            buffer.detach();
            self.mru.remove(id);
        }

        Ok(())
    }

    /// Slide an idle buffer down against the extent below it.
    ///
    /// The buffer never passes another extent, so address order is kept.
    fn compact(&mut self, id: BufferId) -> Result<()> {
        let buffer = self.registry.get_mut(id)?;
        if !buffer.is_evictable() {
            return Ok(());
        }
        let Some(old) = buffer.node() else {
            return Ok(());
        };
        let size = buffer.size();

        let old_extent = self.allocator.remove(old)?;
        buffer.detach();

        let floor = self
            .allocator
            .hole_at(old_extent.start)
            .map_or(old_extent.start, |hole| hole.start);
        let target = floor..old_extent.end();

        match self
            .allocator
            .insert_in_range(size, self.config.alignment, 0, target, InsertMode::Low)
        {
            Ok(node) => {
                buffer.attach(node);
                if self.allocator.extent(node).map(|e| e.start) != Some(old_extent.start) {
                    PoolStats::bump(&self.stats.compactions);
                    trace!(buffer = %id, from = old_extent.start, "compacted buffer");
                }
                Ok(())
            }
            Err(e) => {
                self.mru.remove(id);
                Err(e.into())
            }
        }
    }
}
