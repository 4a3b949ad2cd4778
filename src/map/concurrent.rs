//! Generic Concurrent Map
//!
//! [`ConcurrentMap`] is a typed, sharded key-value map whose compound
//! operations are atomic per key. It is built on [`RawMap`], which decides
//! which shard owns a key; every operation here runs entirely inside that one
//! shard's critical section, so no caller ever observes a half-applied update.
//!
//! ## Atomicity
//!
//! `load_or_store`, `load_and_delete`, `swap`, `compare_and_swap` and
//! `compare_and_delete` each read and write under a single write lock, which
//! makes them linearizable with respect to each other on the same key.
//! Operations on different keys are unordered.
//!
//! `range` is weakly consistent: it snapshots one shard at a time and releases
//! the lock before calling the visitor, so the visitor may call back into the
//! map. Entries added or removed while a range is running may or may not be
//! seen.
//!
//! ## Comparability
//!
//! `compare_and_swap` and `compare_and_delete` require `V: PartialEq`. The
//! bound sits on those two methods only, so a map of non-comparable values
//! still supports every other operation, while asking it to compare them is
//! rejected by the compiler:
//!
//! ```rust,compile_fail
//! use std::sync::Arc;
//! use syncgen::ConcurrentMap;
//!
//! type Callback = Arc<dyn Fn() + Send + Sync>;
//!
//! let map: ConcurrentMap<&str, Callback> = ConcurrentMap::new();
//! let callback: Callback = Arc::new(|| {});
//! map.store("foo", callback.clone());
//! map.compare_and_swap(&"foo", &callback, callback.clone());
//! ```
//!
//! ## Example
//!
//! ```rust
//! use syncgen::ConcurrentMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ConcurrentMap::new());
//! map.store("hits", 0u64);
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 // Callers compose their own CAS loops
//!                 loop {
//!                     let current = map.load(&"hits").unwrap();
//!                     if map.compare_and_swap(&"hits", &current, current + 1) {
//!                         break;
//!                     }
//!                 }
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! assert_eq!(map.load(&"hits"), Some(400));
//! ```

use super::raw::RawMap;
use crate::config::MapConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::Result;
use core::borrow::Borrow;
use core::hash::Hash;
use std::collections::hash_map::Entry;

/// A concurrent map with atomic compound operations
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq`
/// * `V` - The value type; reads return clones, so most readers need `V: Clone`
///
/// A map is `Send + Sync` whenever `K` and `V` are, and all operations take
/// `&self`. Share it behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use syncgen::ConcurrentMap;
///
/// let map = ConcurrentMap::new();
/// map.store("foo", 42);
/// assert_eq!(map.load_and_delete(&"foo"), Some(42));
/// assert_eq!(map.load_and_delete(&"foo"), None);
/// ```
pub struct ConcurrentMap<K, V> {
    raw: RawMap<K, V>,
}

impl<K, V> ConcurrentMap<K, V> {
    /// Create an empty map with the default shard count
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i32, String> = ConcurrentMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self { raw: RawMap::new() }
    }

    /// Create an empty map from a config
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid; use [`try_with_config`](Self::try_with_config)
    /// to handle that case.
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            raw: RawMap::with_config(config),
        }
    }

    /// Create an empty map from a config, rejecting invalid ones
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::{ConcurrentMap, Error, MapConfig};
    ///
    /// let err = ConcurrentMap::<i32, i32>::try_with_config(MapConfig::new().shards(0));
    /// assert_eq!(err.unwrap_err(), Error::InvalidShardCount { requested: 0 });
    /// ```
    pub fn try_with_config(config: MapConfig) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            raw: RawMap::from_validated(config),
        })
    }

    /// Number of shards the map is split into
    pub fn shard_count(&self) -> usize {
        self.raw.shard_count()
    }

    /// Number of entries
    ///
    /// Each shard is counted under its own lock, so under concurrent mutation
    /// the result is a close approximation rather than an exact snapshot.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Remove every entry
    ///
    /// All shard locks are held while the map is emptied, so a `load` issued
    /// after `clear` returns misses every key that was not re-inserted
    /// concurrently. Removed values are dropped after the locks are released.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.store(1, "one");
    /// map.clear();
    /// assert_eq!(map.load(&1), None);
    /// map.store(2, "two");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn clear(&self) {
        let mut shards = self.raw.write_all();
        let drained: Vec<_> = shards
            .iter_mut()
            .map(|shard| core::mem::take(&mut **shard))
            .collect();
        drop(shards);

        self.raw.metrics().record_operation();
        let removed: usize = drained.iter().map(|shard| shard.len()).sum();
        tracing::debug!(removed, "cleared concurrent map");
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    /// Return the value stored for `key`, or `None` if there is none
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.store("foo".to_string(), 42);
    /// assert_eq!(map.load("foo"), Some(42));
    /// assert_eq!(map.load("bar"), None);
    /// ```
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.raw.read(key).get(key).cloned();
        self.raw.metrics().record(value.is_some());
        value
    }

    /// Whether `key` has a value
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.raw.read(key).contains_key(key);
        self.raw.metrics().record(found);
        found
    }

    /// Set the value for `key`, replacing any previous one
    pub fn store(&self, key: K, value: V) {
        let previous = self.raw.write(&key).insert(key, value);
        self.raw.metrics().record_operation();
        drop(previous);
    }

    /// Remove `key`; does nothing if it is absent
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.raw.write(key).remove(key);
        self.raw.metrics().record(removed.is_some());
    }

    /// Return the existing value for `key`, or store `value` if there is none
    ///
    /// Returns `(existing, true)` when the key was present, leaving it untouched,
    /// and `(value, false)` when `value` was stored. Among concurrent calls for
    /// the same absent key exactly one stores; every other call loads its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.load_or_store("foo", 42), (42, false));
    /// assert_eq!(map.load_or_store("foo", 12345), (42, true));
    /// ```
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let mut shard = self.raw.write(&key);
        let result = match shard.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => (entry.insert(value).clone(), false),
        };
        drop(shard);

        self.raw.metrics().record(result.1);
        result
    }

    /// Remove `key` and return the value it had, if any
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.raw.write(key).remove(key);
        self.raw.metrics().record(value.is_some());
        value
    }

    /// Store `value` for `key` and return the previous value, if any
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.swap("foo", 12), None);
    /// assert_eq!(map.swap("foo", 42), Some(12));
    /// assert_eq!(map.load(&"foo"), Some(42));
    /// ```
    pub fn swap(&self, key: K, value: V) -> Option<V> {
        let previous = self.raw.write(&key).insert(key, value);
        self.raw.metrics().record(previous.is_some());
        previous
    }

    /// Replace the value for `key` with `new` only if it currently equals `old`
    ///
    /// Returns whether the swap happened. An absent key never matches.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.store("foo", 42);
    /// assert!(!map.compare_and_swap(&"foo", &12, 69));
    /// assert_eq!(map.load(&"foo"), Some(42));
    /// assert!(map.compare_and_swap(&"foo", &42, 12));
    /// assert_eq!(map.load(&"foo"), Some(12));
    /// ```
    pub fn compare_and_swap<Q>(&self, key: &Q, old: &V, new: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut shard = self.raw.write(key);
        let previous = match shard.get_mut(key) {
            Some(current) if *current == *old => Some(core::mem::replace(current, new)),
            _ => None,
        };
        drop(shard);

        let swapped = previous.is_some();
        self.raw.metrics().record(swapped);
        swapped
    }

    /// Remove `key` only if its value currently equals `old`
    ///
    /// Returns whether the entry was removed. An absent key never matches.
    ///
    /// Like [`compare_and_swap`](Self::compare_and_swap), this needs
    /// `V: PartialEq`:
    ///
    /// ```rust,compile_fail
    /// use std::sync::Arc;
    /// use syncgen::ConcurrentMap;
    ///
    /// type Callback = Arc<dyn Fn() + Send + Sync>;
    ///
    /// let map: ConcurrentMap<&str, Callback> = ConcurrentMap::new();
    /// let callback: Callback = Arc::new(|| {});
    /// map.store("foo", callback.clone());
    /// map.compare_and_delete(&"foo", &callback);
    /// ```
    pub fn compare_and_delete<Q>(&self, key: &Q, old: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut shard = self.raw.write(key);
        let matches = shard.get(key).is_some_and(|current| *current == *old);
        let removed = if matches { shard.remove(key) } else { None };
        drop(shard);

        let deleted = removed.is_some();
        self.raw.metrics().record(deleted);
        deleted
    }

    /// Call `visit` for each entry until it returns `false`
    ///
    /// Visiting order is unspecified. The visitor runs without any lock held
    /// and may freely call back into the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.store("foo", 42);
    /// map.store("bar", 12);
    ///
    /// let mut sum = 0;
    /// map.range(|_, value| {
    ///     sum += value;
    ///     true
    /// });
    /// assert_eq!(sum, 54);
    /// ```
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> bool,
        K: Clone,
        V: Clone,
    {
        for index in 0..self.raw.shard_count() {
            let snapshot: Vec<(K, V)> = self
                .raw
                .read_shard(index)
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            for (key, value) in &snapshot {
                if !visit(key, value) {
                    return;
                }
            }
        }
    }
}

impl<K, V> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> core::fmt::Debug for ConcurrentMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("len", &self.len())
            .field("shards", &self.shard_count())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (key, value) in iter {
            map.store(key, value);
        }
        map
    }
}

impl<K, V> Extend<(K, V)> for ConcurrentMap<K, V>
where
    K: Hash + Eq,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.store(key, value);
        }
    }
}

impl<K, V> MetricsCollector for ConcurrentMap<K, V> {
    fn metrics(&self) -> MetricsSnapshot {
        self.raw.metrics().snapshot()
    }

    fn reset_metrics(&self) {
        self.raw.metrics().reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.raw.metrics().set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.raw.metrics().is_enabled()
    }
}
