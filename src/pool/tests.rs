//! Unit and stress tests for the object pool

use super::*;
use crate::config::PoolConfig;
use crate::metrics::MetricsCollector;
use crate::Error;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_returns_zero_value() {
    let mut pool: ObjectPool<Vec<u8>> = ObjectPool::new();
    assert_eq!(pool.get(), Vec::<u8>::new());

    pool.clear_factory();
    assert!(!pool.has_factory());
    assert_eq!(pool.get(), Vec::<u8>::new());
}

#[test]
fn test_returns_new_value() {
    let pool = ObjectPool::new().with_factory(|| vec![0u8; 8]);
    let item = pool.get();
    assert_eq!(item.len(), 8);
}

#[test]
fn test_set_factory_is_fluent() {
    let mut pool = ObjectPool::new();
    pool.set_factory(|| String::from("a")).set_factory(|| String::from("b"));
    assert_eq!(pool.get(), "b");

    pool.clear_factory();
    assert_eq!(pool.get(), "");
}

#[test]
fn test_recycles_returned_items() {
    let built = Arc::new(AtomicUsize::new(0));
    let pool = {
        let built = Arc::clone(&built);
        ObjectPool::new().with_factory(move || {
            built.fetch_add(1, Ordering::Relaxed);
            Vec::<u32>::with_capacity(16)
        })
    };

    let mut item = pool.get();
    item.push(1);
    pool.put(item);
    assert_eq!(pool.idle(), 1);

    // Without a reset hook the item comes back as it was left
    let item = pool.get();
    assert_eq!(item, vec![1]);
    assert_eq!(built.load(Ordering::Relaxed), 1);
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_reset_hook_runs_on_put() {
    let pool = ObjectPool::new().with_reset(|s: &mut String| s.clear());

    let mut item = pool.get();
    item.push_str("dirty");
    pool.put(item);

    assert_eq!(pool.get(), "");
}

#[test]
fn test_checkout_returns_on_drop() {
    let pool = ObjectPool::new().with_factory(|| vec![0u8; 4]);
    {
        let mut item = pool.checkout();
        item[0] = 9;
        assert_eq!(pool.idle(), 0);
    }
    assert_eq!(pool.idle(), 1);
    assert_eq!(pool.get(), vec![9, 0, 0, 0]);
}

#[test]
fn test_detach_keeps_item() {
    let pool: ObjectPool<u64> = ObjectPool::new();
    pool.put(5);

    let item = pool.checkout();
    assert_eq!(*item, 5);
    assert_eq!(format!("{item:?}"), "Pooled(5)");
    assert_eq!(Pooled::detach(item), 5);
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_idle_limit_discards_extra_items() {
    let pool: ObjectPool<u32> = ObjectPool::with_config(PoolConfig::new().max_idle(2));
    pool.put(1);
    pool.put(2);
    pool.put(3);

    assert_eq!(pool.idle(), 2);
    assert_eq!(pool.metrics().discarded, 1);
}

#[test]
fn test_invalid_config() {
    let result = ObjectPool::<u32>::try_with_config(PoolConfig::new().max_idle(0));
    assert_eq!(result.err(), Some(Error::InvalidIdleLimit));
}

#[test]
#[should_panic(expected = "invalid idle limit")]
fn test_invalid_config_panics() {
    let _pool: ObjectPool<u32> = ObjectPool::with_config(PoolConfig::new().max_idle(0));
}

#[test]
fn test_drop_releases_idle_items() {
    let tracker = Arc::new(());
    {
        let pool = ObjectPool::new();
        for _ in 0..8 {
            pool.put(Some(Arc::clone(&tracker)));
        }
        assert_eq!(Arc::strong_count(&tracker), 9);
    }
    assert_eq!(Arc::strong_count(&tracker), 1);
}

#[test]
fn test_debug() {
    let pool = ObjectPool::new().with_factory(|| 1u8);
    assert_eq!(
        format!("{pool:?}"),
        format!(
            "ObjectPool {{ idle: 0, max_idle: {}, has_factory: true, has_reset: false }}",
            usize::MAX
        )
    );
}

#[test]
fn test_metrics() {
    let pool = ObjectPool::new().with_factory(|| 0u8);
    let item = pool.get();
    pool.put(item);
    let _ = pool.get();

    let metrics = pool.metrics();
    assert_eq!(metrics.total_operations, 3);
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.constructed, 1);

    pool.reset_metrics();
    assert_eq!(pool.metrics().total_operations, 0);
    assert!(pool.is_metrics_enabled());
}

#[test]
fn test_concurrent_items_never_shared() {
    let num_threads = 8;
    let rounds = 2_000;
    let next_id = Arc::new(AtomicUsize::new(0));
    let pool = {
        let next_id = Arc::clone(&next_id);
        Arc::new(ObjectPool::new().with_factory(move || next_id.fetch_add(1, Ordering::Relaxed)))
    };
    let in_use = Arc::new(Mutex::new(HashSet::new()));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let in_use = Arc::clone(&in_use);
            thread::spawn(move || {
                for _ in 0..rounds {
                    let item = pool.checkout();
                    assert!(in_use.lock().unwrap().insert(*item), "item {} handed out twice", *item);
                    thread::yield_now();
                    assert!(in_use.lock().unwrap().remove(&*item));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every item ever built was returned, and no more were built than could be in use at once
    let built = next_id.load(Ordering::Relaxed);
    assert_eq!(pool.metrics().discarded, 0);
    assert_eq!(pool.idle(), built);
    assert!(built <= num_threads, "built {built} items for {num_threads} threads");
}

#[test]
fn test_unbounded_pool_never_discards_under_contention() {
    let num_threads = 8;
    let rounds = 50_000;
    let pool: Arc<ObjectPool<u64>> = Arc::new(ObjectPool::new());
    let finished = Arc::new(AtomicUsize::new(0));

    let sampler = {
        let pool = Arc::clone(&pool);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            let mut max_idle_seen = 0;
            while finished.load(Ordering::Relaxed) < num_threads {
                max_idle_seen = max_idle_seen.max(pool.idle());
            }
            max_idle_seen
        })
    };

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                for _ in 0..rounds {
                    let item = pool.get();
                    pool.put(item);
                }
                finished.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    let max_idle_seen = sampler.join().unwrap();

    let metrics = pool.metrics();
    assert_eq!(metrics.discarded, 0);
    assert!(metrics.constructed <= num_threads as u64, "built {} items", metrics.constructed);
    assert!(max_idle_seen <= num_threads, "idle count reached {max_idle_seen}");
    assert_eq!(pool.idle() as u64, metrics.constructed);
}

#[test]
fn test_concurrent_get_put_with_idle_limit() {
    let pool = Arc::new(
        ObjectPool::with_config(PoolConfig::new().max_idle(4)).with_factory(|| vec![0u8; 64]),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let buf = pool.get();
                    assert_eq!(buf.len(), 64);
                    pool.put(buf);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // The limit is checked without locking, so concurrent puts may overshoot
    // by at most one item per thread
    assert!(pool.idle() <= 4 + 8);
}
