//! Construction-time configuration for maps and pools
//!
//! Both containers work out of the box through `new()`/`Default`; a config is
//! only needed to tune sharding or bound the number of idle pooled items.
//!
//! ```rust
//! use syncgen::{ConcurrentMap, MapConfig};
//!
//! let config = MapConfig::new().shards(64).initial_capacity(1024);
//! let map: ConcurrentMap<u64, String> = ConcurrentMap::try_with_config(config)?;
//! assert_eq!(map.shard_count(), 64);
//! # Ok::<(), syncgen::Error>(())
//! ```

use crate::{Error, Result};

/// Default number of shards for a map
const DEFAULT_SHARDS: usize = 16;

/// Sharding parameters for a [`ConcurrentMap`](crate::ConcurrentMap)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapConfig {
    /// Number of independently locked shards, rounded up to a power of two
    pub shards: usize,
    /// Total number of entries to pre-allocate room for, spread over all shards
    pub initial_capacity: usize,
}

impl MapConfig {
    /// Upper bound on the shard count
    pub const MAX_SHARDS: usize = 1024;

    /// Create a config with the default shard count and no pre-allocation
    pub const fn new() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            initial_capacity: 0,
        }
    }

    /// Set the shard count
    pub const fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the number of entries to pre-allocate room for
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Check the config and normalize the shard count to a power of two
    pub fn validate(self) -> Result<Self> {
        if self.shards == 0 || self.shards > Self::MAX_SHARDS {
            tracing::warn!(requested = self.shards, "rejecting map config");
            return Err(Error::InvalidShardCount {
                requested: self.shards,
            });
        }

        Ok(Self {
            shards: self.shards.next_power_of_two(),
            ..self
        })
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retention parameters for an [`ObjectPool`](crate::ObjectPool)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Maximum number of idle items kept; items returned beyond it are dropped
    pub max_idle: usize,
}

impl PoolConfig {
    /// Create a config with no idle limit
    pub const fn new() -> Self {
        Self { max_idle: usize::MAX }
    }

    /// Set the idle limit
    pub const fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Check the config
    pub fn validate(self) -> Result<Self> {
        if self.max_idle == 0 {
            tracing::warn!("rejecting pool config with zero idle limit");
            return Err(Error::InvalidIdleLimit);
        }
        Ok(self)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
