//! Operation Metrics Module
//!
//! Lightweight counters shared by the map and the pool. They give insight into
//! hit rates and contention without taking locks: every counter is a relaxed
//! atomic, so a snapshot taken under load is approximate.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Point-in-time copy of a container's counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of counted operations
    pub total_operations: u64,
    /// Operations that found what they looked for (key present, compare matched, item recycled)
    pub hits: u64,
    /// Operations that did not (key absent, compare mismatched, pool empty)
    pub misses: u64,
    /// Operations that had to wait for a shard lock or retry a CAS
    pub contended_operations: u64,
    /// Items built by a pool factory or `Default` on a miss
    pub constructed: u64,
    /// Items a pool dropped because its idle limit was reached
    pub discarded: u64,
}

impl MetricsSnapshot {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        Self::percent(self.hits, self.total_operations)
    }

    /// Miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        Self::percent(self.misses, self.total_operations)
    }

    /// Contention rate as a percentage
    pub fn contention_rate(&self) -> f64 {
        Self::percent(self.contended_operations, self.total_operations)
    }

    fn percent(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

/// Internal atomic metrics collection
#[derive(Debug)]
pub struct AtomicMetrics {
    total_operations: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    contended_operations: AtomicU64,
    constructed: AtomicU64,
    discarded: AtomicU64,
    enabled: AtomicBool,
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self {
            total_operations: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            contended_operations: AtomicU64::new(0),
            constructed: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }
}

impl AtomicMetrics {
    #[inline]
    fn bump(&self, counter: &AtomicU64) {
        if self.enabled.load(Ordering::Relaxed) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an operation and whether it hit
    #[inline]
    pub fn record(&self, hit: bool) {
        self.bump(&self.total_operations);
        if hit {
            self.bump(&self.hits);
        } else {
            self.bump(&self.misses);
        }
    }

    /// Record an operation with no hit/miss outcome (e.g. an unconditional store)
    #[inline]
    pub fn record_operation(&self) {
        self.bump(&self.total_operations);
    }

    /// Record a contended operation
    #[inline]
    pub fn record_contention(&self) {
        self.bump(&self.contended_operations);
    }

    /// Record a pool construction on miss
    #[inline]
    pub fn record_constructed(&self) {
        self.bump(&self.constructed);
    }

    /// Record a pool item dropped at the idle limit
    #[inline]
    pub fn record_discarded(&self) {
        self.bump(&self.discarded);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_operations: self.total_operations.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            contended_operations: self.contended_operations.load(Ordering::Relaxed),
            constructed: self.constructed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.total_operations.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.contended_operations.store(0, Ordering::Relaxed);
        self.constructed.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
    }

    /// Turn counting on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether counting is on
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

/// Trait for containers that expose operation metrics
pub trait MetricsCollector {
    /// Get current metrics
    fn metrics(&self) -> MetricsSnapshot;

    /// Reset all metrics
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
