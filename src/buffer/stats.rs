//! Pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the buffer pool.
///
/// All fields are atomic so they can be bumped through `&self`.
/// We use `Ordering::Relaxed` everywhere: counters are independent and
/// only read for reporting.
///
/// # Example
/// ```
/// use cmapool::PoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = PoolStats::new();
/// stats.use_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.use_hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Buffers that obtained an extent.
    pub page_ins: AtomicU64,

    /// Page-ins satisfied by the first best-fit insertion.
    pub direct_hits: AtomicU64,

    /// Page-ins that needed a purge or an eviction scan first.
    pub reclaim_hits: AtomicU64,

    /// Buffers dropped by the opportunistic purge.
    pub purged: AtomicU64,

    /// Buffers dropped by eviction scans.
    pub evicted: AtomicU64,

    /// Eviction scans started.
    pub scans: AtomicU64,

    /// Page-ins that failed after every fallback.
    pub failures: AtomicU64,

    /// `use` of a buffer that was paged in.
    pub use_hits: AtomicU64,

    /// `use` of a buffer that had to be paged in.
    pub use_misses: AtomicU64,

    /// Buffers moved to a lower address on release.
    pub compactions: AtomicU64,
}

impl PoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one.
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of `use` commands that found the buffer paged in (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            page_ins: self.page_ins.load(Ordering::Relaxed),
            direct_hits: self.direct_hits.load(Ordering::Relaxed),
            reclaim_hits: self.reclaim_hits.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            use_hits: self.use_hits.load(Ordering::Relaxed),
            use_misses: self.use_misses.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.page_ins,
            &self.direct_hits,
            &self.reclaim_hits,
            &self.purged,
            &self.evicted,
            &self.scans,
            &self.failures,
            &self.use_hits,
            &self.use_misses,
            &self.compactions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub page_ins: u64,
    pub direct_hits: u64,
    pub reclaim_hits: u64,
    pub purged: u64,
    pub evicted: u64,
    pub scans: u64,
    pub failures: u64,
    pub use_hits: u64,
    pub use_misses: u64,
    pub compactions: u64,
}

impl StatsSnapshot {
    /// Fraction of `use` commands that found the buffer paged in.
    pub fn hit_rate(&self) -> f64 {
        let total = self.use_hits + self.use_misses;
        if total == 0 {
            0.0
        } else {
            self.use_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ page_ins: {}, direct: {}, purged: {}, evicted: {}, scans: {}, \
             failures: {}, compactions: {}, use_hit_rate: {:.2}% }}",
            self.page_ins,
            self.direct_hits,
            self.purged,
            self.evicted,
            self.scans,
            self.failures,
            self.compactions,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = PoolStats::new();
        assert_eq!(stats.page_ins.load(Ordering::Relaxed), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PoolStats::new();
        stats.use_hits.fetch_add(7, Ordering::Relaxed);
        stats.use_misses.fetch_add(3, Ordering::Relaxed);
        PoolStats::bump(&stats.evicted);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.use_hits, 7);
        assert_eq!(snapshot.evicted, 1);
        assert_eq!(snapshot.hit_rate(), 0.7);
    }

    #[test]
    fn test_stats_reset() {
        let stats = PoolStats::new();
        stats.purged.fetch_add(100, Ordering::Relaxed);
        stats.use_hits.fetch_add(1, Ordering::Relaxed);

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = PoolStats::new();
        stats.use_hits.fetch_add(80, Ordering::Relaxed);
        stats.use_misses.fetch_add(20, Ordering::Relaxed);
        stats.evicted.fetch_add(5, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("evicted: 5"));
        assert!(display.contains("80.00%"));
    }
}
