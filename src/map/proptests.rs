//! Property-based tests for the concurrent map using proptest
//!
//! A random sequence of operations is applied both to a [`ConcurrentMap`] and
//! to a plain `HashMap` model; every result and the final contents must agree.

use super::ConcurrentMap;
use crate::config::MapConfig;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Load(u8),
    Store(u8, i32),
    Delete(u8),
    LoadOrStore(u8, i32),
    LoadAndDelete(u8),
    Swap(u8, i32),
    CompareAndSwap(u8, i32, i32),
    CompareAndDelete(u8, i32),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small key and value ranges so compare operations actually match
    let key = 0u8..16;
    let value = 0i32..4;
    prop_oneof![
        4 => key.clone().prop_map(Op::Load),
        4 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::Store(k, v)),
        2 => key.clone().prop_map(Op::Delete),
        3 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::LoadOrStore(k, v)),
        2 => key.clone().prop_map(Op::LoadAndDelete),
        3 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::Swap(k, v)),
        4 => (key.clone(), value.clone(), value.clone())
            .prop_map(|(k, old, new)| Op::CompareAndSwap(k, old, new)),
        3 => (key, value).prop_map(|(k, old)| Op::CompareAndDelete(k, old)),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn test_matches_hash_map_model(
        shards in prop::sample::select(vec![1usize, 2, 16, 64]),
        ops in prop::collection::vec(op_strategy(), 1..200)
    ) {
        let map = ConcurrentMap::with_config(MapConfig::new().shards(shards));
        let mut model: HashMap<u8, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Load(k) => {
                    prop_assert_eq!(map.load(&k), model.get(&k).copied());
                }
                Op::Store(k, v) => {
                    map.store(k, v);
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    map.delete(&k);
                    model.remove(&k);
                }
                Op::LoadOrStore(k, v) => {
                    let expected = match model.get(&k) {
                        Some(existing) => (*existing, true),
                        None => {
                            model.insert(k, v);
                            (v, false)
                        }
                    };
                    prop_assert_eq!(map.load_or_store(k, v), expected);
                }
                Op::LoadAndDelete(k) => {
                    prop_assert_eq!(map.load_and_delete(&k), model.remove(&k));
                }
                Op::Swap(k, v) => {
                    prop_assert_eq!(map.swap(k, v), model.insert(k, v));
                }
                Op::CompareAndSwap(k, old, new) => {
                    let expected = model.get(&k) == Some(&old);
                    if expected {
                        model.insert(k, new);
                    }
                    prop_assert_eq!(map.compare_and_swap(&k, &old, new), expected);
                }
                Op::CompareAndDelete(k, old) => {
                    let expected = model.get(&k) == Some(&old);
                    if expected {
                        model.remove(&k);
                    }
                    prop_assert_eq!(map.compare_and_delete(&k, &old), expected);
                }
                Op::Clear => {
                    map.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        let mut ranged = HashMap::new();
        map.range(|k, v| {
            ranged.insert(*k, *v);
            true
        });
        prop_assert_eq!(ranged, model);
    }

    #[test]
    fn test_range_visits_each_key_once(keys in prop::collection::hash_set(any::<u32>(), 0..300)) {
        let map: ConcurrentMap<u32, u32> = keys.iter().map(|k| (*k, *k)).collect();

        let mut seen = Vec::new();
        map.range(|k, v| {
            assert_eq!(k, v);
            seen.push(*k);
            true
        });

        prop_assert_eq!(seen.len(), keys.len());
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), keys.len());
    }

    #[test]
    fn test_store_then_load(key in ".*", value in any::<i64>()) {
        let map = ConcurrentMap::new();
        map.store(key.clone(), value);
        prop_assert_eq!(map.load(key.as_str()), Some(value));
        map.delete(key.as_str());
        prop_assert_eq!(map.load(key.as_str()), None);
    }
}
