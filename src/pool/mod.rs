//! Pool implementations
//!
//! - [`ObjectPool`]: typed pool with an optional factory, reset hook and idle limit
//! - [`FreeList`]: the lock-free bag of idle items it is built on
//!
//! ## When to pool
//!
//! - Pool objects whose construction dominates their use (large buffers, scratch maps)
//! - Install a reset hook so no state leaks from one user to the next
//! - Set an idle limit when bursts would otherwise leave many items parked

pub mod free_list;
pub mod object_pool;

pub use self::free_list::FreeList;
pub use self::object_pool::{ObjectPool, Pooled};

#[cfg(test)]
mod tests;
