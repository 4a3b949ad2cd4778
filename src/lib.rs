//! # syncgen
//!
//! Generic, type-safe concurrent containers built for contended workloads.
//!
//! ## Features
//!
//! - **ConcurrentMap**: Sharded key-value map with atomic compound operations
//!   (`load_or_store`, `swap`, `compare_and_swap`, `compare_and_delete`, `load_and_delete`)
//! - **ObjectPool**: Lock-free pool of reusable objects with an optional factory
//!
//! The two components are independent; neither depends on the other.
//!
//! ## Quick Start
//!
//! ```rust
//! use syncgen::{ConcurrentMap, ObjectPool};
//!
//! let map = ConcurrentMap::new();
//! map.store("foo", 42);
//! assert!(!map.compare_and_swap(&"foo", &12, 69));
//! assert!(map.compare_and_swap(&"foo", &42, 12));
//! assert_eq!(map.load(&"foo"), Some(12));
//!
//! let pool = ObjectPool::new().with_factory(|| vec![0u8; 8]);
//! let buf = pool.get();
//! assert_eq!(buf.len(), 8);
//! pool.put(buf);
//! ```
//!
//! ## Thread Safety
//!
//! Every operation takes `&self`, so a map or pool can be shared behind an
//! [`Arc`](std::sync::Arc) without additional synchronization. Compound map
//! operations are linearizable per key. Locks are never exposed to callers.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod map;
pub mod metrics;
pub mod pool;

pub use crate::config::{MapConfig, PoolConfig};
pub use crate::map::ConcurrentMap;
pub use crate::pool::{ObjectPool, Pooled};

/// Common utilities and helper types
pub mod util {
    /// Cache line size for alignment purposes
    pub const CACHE_LINE_SIZE: usize = 64;

    // `repr(align)` only takes a literal
    const _: () = assert!(core::mem::align_of::<CachePadded<u8>>() == CACHE_LINE_SIZE);

    /// Pad a value to [`CACHE_LINE_SIZE`] bytes so neighbouring values never
    /// share a line
    #[derive(Default)]
    #[repr(align(64))]
    pub struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        /// Create a new cache-padded value
        #[inline]
        pub const fn new(value: T) -> Self {
            Self { value }
        }

        /// Get the inner value
        #[inline]
        pub fn into_inner(self) -> T {
            self.value
        }
    }

    impl<T> core::ops::Deref for CachePadded<T> {
        type Target = T;

        #[inline]
        fn deref(&self) -> &T {
            &self.value
        }
    }

    impl<T> core::ops::DerefMut for CachePadded<T> {
        #[inline]
        fn deref_mut(&mut self) -> &mut T {
            &mut self.value
        }
    }

    impl<T: core::fmt::Debug> core::fmt::Debug for CachePadded<T> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Debug::fmt(&self.value, f)
        }
    }
}

/// Error types for syncgen configuration
///
/// Container operations themselves never fail: misses are reported through
/// `Option`/`bool` results. Errors only arise when validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Shard count is zero or above [`MapConfig::MAX_SHARDS`]
    #[error("invalid shard count {requested}: must be between 1 and {max}", max = MapConfig::MAX_SHARDS)]
    InvalidShardCount {
        /// The shard count that was requested
        requested: usize,
    },
    /// Idle limit of zero would make the pool discard every returned item
    #[error("invalid idle limit: a pool must be able to keep at least one idle item")]
    InvalidIdleLimit,
}

/// Result type for syncgen operations
pub type Result<T> = core::result::Result<T, Error>;
