//! Generic Object Pool
//!
//! [`ObjectPool`] keeps idle instances of `T` on a lock-free [`FreeList`] so
//! transient allocations (buffers, scratch structures) can be reused across
//! threads instead of being rebuilt for every request.
//!
//! ## Getting an item
//!
//! [`get`](ObjectPool::get) never blocks and never fails. In order it returns:
//!
//! 1. an idle item, if one is available
//! 2. a fresh item from the factory, if one is installed
//! 3. `T::default()`
//!
//! ## Returning an item
//!
//! Items go back through [`put`](ObjectPool::put), or automatically when a
//! [`Pooled`] guard obtained from [`checkout`](ObjectPool::checkout) is
//! dropped. An optional reset hook scrubs each returned item, and an optional
//! idle limit bounds how many items the pool keeps around.
//!
//! ## Example
//!
//! ```rust
//! use syncgen::ObjectPool;
//!
//! let pool = ObjectPool::new()
//!     .with_factory(|| Vec::<u8>::with_capacity(1024))
//!     .with_reset(|buf| buf.clear());
//!
//! let mut buf = pool.checkout();
//! buf.extend_from_slice(b"hello");
//! drop(buf);
//!
//! // The buffer comes back empty but keeps its allocation
//! let buf = pool.get();
//! assert!(buf.is_empty());
//! assert!(buf.capacity() >= 1024);
//! ```

use super::free_list::FreeList;
use crate::config::PoolConfig;
use crate::metrics::{AtomicMetrics, MetricsCollector, MetricsSnapshot};
use crate::Result;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// A concurrent pool of reusable objects
///
/// Configuration (`set_factory`, `set_reset`) needs `&mut self` and happens
/// before the pool is shared; `get`, `put` and `checkout` take `&self`.
///
/// # Examples
///
/// ```rust
/// use syncgen::ObjectPool;
///
/// // No factory: an empty pool hands out the zero value
/// let pool: ObjectPool<Vec<u8>> = ObjectPool::new();
/// assert_eq!(pool.get(), Vec::<u8>::new());
///
/// // With a factory: an empty pool builds a fresh item
/// let pool = ObjectPool::new().with_factory(|| vec![0u8; 8]);
/// assert_eq!(pool.get().len(), 8);
/// ```
pub struct ObjectPool<T> {
    idle: FreeList<T>,
    factory: Option<Factory<T>>,
    reset: Option<Reset<T>>,
    max_idle: usize,
    metrics: AtomicMetrics,
}

impl<T> ObjectPool<T> {
    /// Create an empty pool with no factory and no idle limit
    pub fn new() -> Self {
        Self::from_validated(PoolConfig::new())
    }

    /// Create an empty pool from a config
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid; use [`try_with_config`](Self::try_with_config)
    /// to handle that case.
    pub fn with_config(config: PoolConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(pool) => pool,
            Err(err) => panic!("{err}"),
        }
    }

    /// Create an empty pool from a config, rejecting invalid ones
    pub fn try_with_config(config: PoolConfig) -> Result<Self> {
        Ok(Self::from_validated(config.validate()?))
    }

    fn from_validated(config: PoolConfig) -> Self {
        Self {
            idle: FreeList::new(),
            factory: None,
            reset: None,
            max_idle: config.max_idle,
            metrics: AtomicMetrics::default(),
        }
    }

    /// Install the function used to build an item when the pool is empty
    ///
    /// Replaces any previous factory. Returns the pool for chaining.
    pub fn set_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Remove the factory, so an empty pool falls back to `T::default()`
    pub fn clear_factory(&mut self) -> &mut Self {
        self.factory = None;
        self
    }

    /// Builder form of [`set_factory`](Self::set_factory)
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.set_factory(factory);
        self
    }

    /// Whether a factory is installed
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Install a hook that scrubs every item handed back through `put`
    pub fn set_reset<F>(&mut self, reset: F) -> &mut Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Builder form of [`set_reset`](Self::set_reset)
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.set_reset(reset);
        self
    }

    /// Hand an item back to the pool
    ///
    /// The reset hook, if any, runs first. When the pool already holds
    /// `max_idle` items the item is dropped instead; the limit is checked
    /// without locking, so concurrent puts may overshoot it slightly.
    pub fn put(&self, mut item: T) {
        if self.idle.len() >= self.max_idle {
            self.metrics.record_discarded();
            tracing::trace!(max_idle = self.max_idle, "pool full, discarding returned item");
            return;
        }

        if let Some(reset) = &self.reset {
            reset(&mut item);
        }
        let attempts = self.idle.push_counted(item);
        if attempts.retries > 0 {
            self.metrics.record_contention();
        }
        self.metrics.record_operation();
    }

    /// Approximate number of idle items
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Maximum number of idle items kept
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

impl<T: Default> ObjectPool<T> {
    /// Take an item: an idle one, else the factory's, else `T::default()`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use syncgen::ObjectPool;
    ///
    /// let pool = ObjectPool::new();
    /// assert_eq!(pool.get(), 0u32);
    ///
    /// pool.put(7);
    /// assert_eq!(pool.get(), 7);
    /// ```
    pub fn get(&self) -> T {
        let (item, attempts) = self.idle.pop_counted();
        if attempts.retries > 0 {
            self.metrics.record_contention();
        }
        self.metrics.record(item.is_some());

        match item {
            Some(item) => item,
            None => self.construct(),
        }
    }

    /// Take an item wrapped in a guard that puts it back when dropped
    pub fn checkout(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            item: ManuallyDrop::new(self.get()),
        }
    }

    fn construct(&self) -> T {
        self.metrics.record_constructed();
        match &self.factory {
            Some(factory) => {
                tracing::trace!("pool empty, building item with factory");
                factory()
            }
            None => {
                tracing::trace!("pool empty, falling back to default item");
                T::default()
            }
        }
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.max_idle)
            .field("has_factory", &self.has_factory())
            .field("has_reset", &self.reset.is_some())
            .finish()
    }
}

impl<T> MetricsCollector for ObjectPool<T> {
    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics.set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics.is_enabled()
    }
}

/// An item checked out of an [`ObjectPool`]
///
/// Dereferences to the item and puts it back into the pool when dropped.
pub struct Pooled<'a, T> {
    pool: &'a ObjectPool<T>,
    item: ManuallyDrop<T>,
}

impl<T> Pooled<'_, T> {
    /// Keep the item instead of returning it to the pool
    ///
    /// ```rust
    /// use syncgen::{ObjectPool, Pooled};
    ///
    /// let pool = ObjectPool::new().with_factory(|| String::from("scratch"));
    /// let owned: String = Pooled::detach(pool.checkout());
    /// assert_eq!(owned, "scratch");
    /// assert_eq!(pool.idle(), 0);
    /// ```
    pub fn detach(this: Self) -> T {
        let mut this = ManuallyDrop::new(this);
        // SAFETY: `this` is never dropped, so the item is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.item) }
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `drop` runs once and `item` is not touched afterwards.
        let item = unsafe { ManuallyDrop::take(&mut self.item) };
        self.pool.put(item);
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Pooled").field(&*self.item).finish()
    }
}
