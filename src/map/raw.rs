//! Lock-striped storage underneath [`ConcurrentMap`](super::ConcurrentMap)
//!
//! The store is split into a power-of-two number of shards, each a plain
//! `HashMap` behind its own `RwLock`. A key always lives in the shard picked by
//! its hash, so every single-key operation needs exactly one shard lock and
//! operations on keys in different shards never contend.
//!
//! The shard tables hash with the same `FxHasher`, taking bucket positions
//! from the low bits and control tags from the top 7 bits. The shard is
//! therefore chosen from a remixed hash, so keys sharing a shard still differ
//! in both.
//!
//! ## Locking
//!
//! - Single-key reads take the shard's read lock
//! - Single-key writes (including compound operations) take the shard's write lock
//! - Whole-map writes take every write lock in index order, so two of them can
//!   never deadlock against each other
//!
//! Lock waits are counted as contention in the store's metrics.

use crate::config::MapConfig;
use crate::metrics::AtomicMetrics;
use crate::util::CachePadded;
use core::borrow::Borrow;
use core::hash::Hash;
use fxhash::FxBuildHasher;
#[cfg(not(loom))]
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(loom)]
use self::loom_lock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;

// Loom's lock behind parking_lot's surface, so model tests run this store
#[cfg(loom)]
mod loom_lock {
    use std::sync::PoisonError;

    pub use loom::sync::{RwLockReadGuard, RwLockWriteGuard};

    pub struct RwLock<T>(loom::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub fn new(value: T) -> Self {
            Self(loom::sync::RwLock::new(value))
        }

        pub fn read(&self) -> RwLockReadGuard<'_, T> {
            self.0.read().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn write(&self) -> RwLockWriteGuard<'_, T> {
            self.0.write().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
            self.0.try_read().ok()
        }

        pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
            self.0.try_write().ok()
        }
    }
}

/// One partition of the store
pub type Shard<K, V> = HashMap<K, V, FxBuildHasher>;

/// A sharded, lock-striped hash store
///
/// This is the primitive the typed map is built on. It only decides *where* a
/// key lives and hands out the matching lock guard; the map semantics are
/// layered on top by [`ConcurrentMap`](super::ConcurrentMap).
///
/// # Examples
///
/// ```rust
/// use syncgen::map::raw::RawMap;
///
/// let raw: RawMap<&str, i32> = RawMap::new();
/// raw.write(&"foo").insert("foo", 42);
/// assert_eq!(raw.read(&"foo").get("foo"), Some(&42));
/// ```
pub struct RawMap<K, V> {
    shards: Box<[CachePadded<RwLock<Shard<K, V>>>]>,
    // Shift that keeps the top log2(shards) bits of the remixed hash
    shift: u32,
    metrics: AtomicMetrics,
}

impl<K, V> RawMap<K, V> {
    /// Create a store with the default shard count
    pub fn new() -> Self {
        Self::with_config(MapConfig::new())
    }

    /// Create a store from a config
    ///
    /// # Panics
    ///
    /// Panics if the config does not pass [`MapConfig::validate`].
    pub fn with_config(config: MapConfig) -> Self {
        match config.validate() {
            Ok(config) => Self::from_validated(config),
            Err(err) => panic!("{err}"),
        }
    }

    pub(crate) fn from_validated(config: MapConfig) -> Self {
        let count = config.shards;
        debug_assert!(count.is_power_of_two());

        let per_shard = config.initial_capacity.div_ceil(count);
        let shards = (0..count)
            .map(|_| {
                CachePadded::new(RwLock::new(HashMap::with_capacity_and_hasher(
                    per_shard,
                    FxBuildHasher::default(),
                )))
            })
            .collect();

        Self {
            shards,
            shift: u64::BITS - count.trailing_zeros(),
            metrics: AtomicMetrics::default(),
        }
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Counters for this store
    pub fn metrics(&self) -> &AtomicMetrics {
        &self.metrics
    }

    /// Read lock on shard `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= shard_count()`.
    pub fn read_shard(&self, index: usize) -> RwLockReadGuard<'_, Shard<K, V>> {
        let lock = &self.shards[index];
        match lock.try_read() {
            Some(guard) => guard,
            None => {
                self.metrics.record_contention();
                lock.read()
            }
        }
    }

    /// Write lock on shard `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= shard_count()`.
    pub fn write_shard(&self, index: usize) -> RwLockWriteGuard<'_, Shard<K, V>> {
        let lock = &self.shards[index];
        match lock.try_write() {
            Some(guard) => guard,
            None => {
                self.metrics.record_contention();
                lock.write()
            }
        }
    }

    /// Write locks on every shard, acquired in index order
    pub fn write_all(&self) -> Vec<RwLockWriteGuard<'_, Shard<K, V>>> {
        (0..self.shards.len()).map(|i| self.write_shard(i)).collect()
    }

    /// Number of entries, summed shard by shard
    pub fn len(&self) -> usize {
        (0..self.shards.len()).map(|i| self.read_shard(i).len()).sum()
    }

    /// Whether every shard is empty
    pub fn is_empty(&self) -> bool {
        (0..self.shards.len()).all(|i| self.read_shard(i).is_empty())
    }
}

// splitmix64 finalizer
#[inline]
fn remix(mut hash: u64) -> u64 {
    hash = (hash ^ (hash >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    hash = (hash ^ (hash >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    hash ^ (hash >> 31)
}

impl<K, V> RawMap<K, V>
where
    K: Hash + Eq,
{
    /// Index of the shard owning `key`
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.shards.len() == 1 {
            return 0;
        }
        (remix(fxhash::hash64(key)) >> self.shift) as usize
    }

    /// Read lock on the shard owning `key`
    pub fn read<Q>(&self, key: &Q) -> RwLockReadGuard<'_, Shard<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_shard(self.shard_index(key))
    }

    /// Write lock on the shard owning `key`
    pub fn write<Q>(&self, key: &Q) -> RwLockWriteGuard<'_, Shard<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write_shard(self.shard_index(key))
    }
}

impl<K, V> Default for RawMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> core::fmt::Debug for RawMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawMap")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}
