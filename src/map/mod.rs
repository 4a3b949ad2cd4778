//! Map implementations
//!
//! - [`ConcurrentMap`]: typed map with atomic compound operations
//! - [`raw::RawMap`]: the lock-striped store it is built on
//!
//! ## Choosing a shard count
//!
//! - The default of 16 shards suits a handful of writer threads
//! - Raise it (see [`MapConfig`](crate::MapConfig)) when many threads write
//!   disjoint keys and [`contention_rate`](crate::metrics::MetricsSnapshot::contention_rate)
//!   stays high
//! - A single shard turns the map into one `RwLock<HashMap>`

pub mod concurrent;
pub mod raw;

pub use self::concurrent::ConcurrentMap;


#[cfg(test)]
mod proptests;
