//! Integration Tests for the Cache Contract
//!
//! Exercises every policy through `dyn Cache`, cross-policy transfer and copy,
//! background expiration, and concurrent access.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, sleep};
use std::time::Duration;

use polycache::{Cache, CacheConfig, LfuCache, LruCache, ManualCache};
use tracing_subscriber::EnvFilter;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Factory = fn(CacheConfig) -> Box<dyn Cache<String, i32>>;

fn manual(config: CacheConfig) -> Box<dyn Cache<String, i32>> {
    Box::new(ManualCache::with_config(config).expect("manual cache"))
}

fn lru(config: CacheConfig) -> Box<dyn Cache<String, i32>> {
    Box::new(LruCache::with_config(config).expect("lru cache"))
}

fn lfu(config: CacheConfig) -> Box<dyn Cache<String, i32>> {
    Box::new(LfuCache::with_config(config).expect("lfu cache"))
}

fn factories() -> Vec<(&'static str, Factory)> {
    vec![
        ("manual", manual as Factory),
        ("lru", lru as Factory),
        ("lfu", lfu as Factory),
    ]
}

fn key(i: usize) -> String {
    format!("k{i}")
}

// == Contract Tests ==

#[test]
fn test_set_get_until_delete_for_all_policies() {
    init_tracing();
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));

        cache.set(key(1), 1);
        assert_eq!(cache.get(&key(1)), Some(1), "{name}");
        assert_eq!(cache.get(&key(1)), Some(1), "{name}");

        assert!(cache.delete(&key(1)), "{name}");
        assert_eq!(cache.get(&key(1)), None, "{name}");
    }
}

#[test]
fn test_not_found_set_for_all_policies() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));

        assert!(cache.not_found_set(key(1), 1), "{name}");
        assert!(!cache.not_found_set(key(1), 2), "{name}");
        assert_eq!(cache.get(&key(1)), Some(1), "{name}");

        cache.set_with_timeout(key(2), 2, Duration::from_millis(20));
        sleep(Duration::from_millis(40));
        assert!(cache.not_found_set(key(2), 3), "{name}: expired key is replaceable");
        assert_eq!(cache.get(&key(2)), Some(3), "{name}");
    }
}

#[test]
fn test_zero_timeout_means_no_expiry_for_all_policies() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));

        cache.set_with_timeout(key(1), 1, Duration::ZERO);
        assert!(cache.not_found_set_with_timeout(key(2), 2, Duration::ZERO), "{name}");
        sleep(Duration::from_millis(30));

        assert_eq!(cache.get(&key(1)), Some(1), "{name}");
        assert_eq!(cache.get(&key(2)), Some(2), "{name}");
    }
}

#[test]
fn test_timeout_expires_for_all_policies() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));

        cache.set_with_timeout(key(1), 1, Duration::from_millis(30));
        assert_eq!(cache.get(&key(1)), Some(1), "{name}");

        sleep(Duration::from_millis(60));

        assert_eq!(cache.get(&key(1)), None, "{name}");
    }
}

#[test]
fn test_count_never_exceeds_len() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));

        cache.set(key(1), 1);
        cache.set_with_timeout(key(2), 2, Duration::from_millis(20));
        assert_eq!(cache.count(), cache.len(), "{name}: nothing expired yet");

        sleep(Duration::from_millis(40));

        assert_eq!(cache.count(), 1, "{name}");
        assert_eq!(cache.len(), 2, "{name}");
        assert_eq!(cache.keys(), vec![key(1)], "{name}");
        assert_eq!(cache.get_all(), HashMap::from([(key(1), 1)]), "{name}");
    }
}

#[test]
fn test_purge_leaves_cache_usable() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));
        for i in 0..5 {
            cache.set(key(i), i as i32);
        }

        cache.purge();
        assert_eq!(cache.count(), 0, "{name}");
        assert_eq!(cache.len(), 0, "{name}");

        cache.set(key(9), 9);
        assert_eq!(cache.get(&key(9)), Some(9), "{name}");
    }
}

#[test]
fn test_capacity_zero_for_all_policies() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(0));

        cache.set(key(1), 1);
        cache.set_with_timeout(key(2), 2, Duration::from_secs(1));
        assert!(!cache.not_found_set(key(3), 3), "{name}");

        assert_eq!(cache.len(), 0, "{name}");
        assert!(cache.is_empty(), "{name}");
    }
}

#[test]
fn test_stats_track_hits_and_misses() {
    for (name, new) in factories() {
        let cache = new(CacheConfig::new(10));
        cache.set(key(1), 1);

        cache.get(&key(1));
        cache.get(&key(1));
        cache.get(&key(2));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2, "{name}");
        assert_eq!(stats.misses, 1, "{name}");
        assert_eq!(stats.total_entries, 1, "{name}");
    }
}

// == Policy Scenarios ==

#[test]
fn test_lru_scenario_capacity_five() {
    let cache = LruCache::new(5);
    for i in 1..=5 {
        cache.set(key(i), i as i32);
    }

    cache.get(&key(1));
    cache.set(key(6), 6);

    assert_eq!(cache.get(&key(2)), None);
    assert_eq!(cache.get(&key(1)), Some(1));
}

#[test]
fn test_lfu_scenario_capacity_three() {
    let cache = LfuCache::new(3);
    cache.set("a".to_string(), 1);
    cache.set("b".to_string(), 2);
    cache.set("c".to_string(), 3);

    cache.get(&"a".to_string());
    cache.get(&"a".to_string());
    cache.get(&"b".to_string());
    cache.set("d".to_string(), 4);

    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "d"]);
}

// == Transfer And Copy ==

#[test]
fn test_transfer_across_policies() {
    let src = LruCache::new(10);
    let dst = LfuCache::new(10);
    src.set(key(1), 1);
    src.set(key(2), 2);
    src.set_with_timeout(key(3), 3, Duration::from_millis(10));
    dst.set(key(2), 20);
    dst.set(key(4), 4);
    sleep(Duration::from_millis(30));

    let moved = src.transfer_to(&dst);

    assert_eq!(moved, 2);
    assert!(src.is_empty());
    assert_eq!(dst.get(&key(1)), Some(1));
    assert_eq!(dst.get(&key(2)), Some(2), "collision resolved by overwrite");
    assert_eq!(dst.get(&key(3)), None, "expired entries are not moved");
    assert_eq!(dst.get(&key(4)), Some(4), "unrelated keys untouched");
}

#[test]
fn test_copy_across_policies() {
    let src = LfuCache::new(10);
    let dst = ManualCache::new(10);
    src.set(key(1), 1);
    src.set(key(2), 2);

    let copied = src.copy_to(&dst);

    assert_eq!(copied, 2);
    assert_eq!(src.len(), 2);
    assert_eq!(src.get(&key(1)), Some(1));
    assert_eq!(dst.get_all(), src.get_all());
}

#[test]
fn test_copy_skips_expired_entries() {
    let src = LruCache::new(10);
    let dst = LfuCache::new(10);
    src.set_with_timeout(key(1), 1, Duration::from_millis(10));
    src.set(key(2), 2);
    sleep(Duration::from_millis(30));

    let copied = src.copy_to(&dst);

    assert_eq!(copied, 1);
    assert_eq!(src.len(), 2, "copy leaves expired entries in the source");
    assert_eq!(dst.len(), 1);
    assert_eq!(dst.get(&key(1)), None);
    assert_eq!(dst.get(&key(2)), Some(2));
}

#[test]
fn test_transfer_through_trait_objects() {
    let caches: Vec<Box<dyn Cache<String, i32>>> = factories()
        .into_iter()
        .map(|(_, new)| new(CacheConfig::new(10)))
        .collect();
    caches[0].set(key(1), 1);

    // manual -> lru -> lfu
    caches[0].transfer_to(&*caches[1]);
    caches[1].transfer_to(&*caches[2]);

    assert!(caches[0].is_empty());
    assert!(caches[1].is_empty());
    assert_eq!(caches[2].get(&key(1)), Some(1));
}

// == Background Expiration ==

#[test]
fn test_background_expiration_for_all_policies() {
    init_tracing();
    for (name, new) in factories() {
        let config = CacheConfig::new(10).with_cleanup_interval(Duration::from_millis(50));
        let cache = new(config);

        cache.set_with_timeout(key(1), 1, Duration::from_millis(10));
        cache.set_with_timeout(key(2), 2, Duration::from_millis(400));
        assert_eq!(cache.get(&key(1)), Some(1), "{name}");

        sleep(Duration::from_millis(150));

        assert_eq!(cache.len(), 1, "{name}: sweeper should have removed k1");
        assert_eq!(cache.get(&key(2)), Some(2), "{name}");
        cache.close();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_expiration_on_runtime() {
    let config = CacheConfig::new(10).with_cleanup_interval(Duration::from_millis(20));
    let cache = LfuCache::with_config(config).unwrap();

    cache.set_with_timeout(key(1), 1, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(cache.len(), 0);
    cache.close();
    cache.close();
}

#[test]
fn test_background_expiration_under_idle_current_thread_runtime() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = runtime.enter();

    for (name, new) in factories() {
        let config = CacheConfig::new(10).with_cleanup_interval(Duration::from_millis(10));
        let cache = new(config);

        cache.set_with_timeout(key(1), 1, Duration::from_millis(5));
        sleep(Duration::from_millis(100));

        assert_eq!(cache.len(), 0, "{name}: sweep must run without the caller driving the runtime");
        cache.close();
    }
}

#[test]
fn test_close_twice_and_use_after_close() {
    for (name, new) in factories() {
        let config = CacheConfig::new(10).with_cleanup_interval(Duration::from_millis(10));
        let cache = new(config);
        cache.set(key(1), 1);

        cache.close();
        cache.close();

        assert_eq!(cache.len(), 0, "{name}");
        cache.set(key(2), 2);
        assert_eq!(cache.get(&key(2)), None, "{name}: writes after close are refused");
    }
}

// == Concurrency ==

#[test]
fn test_concurrent_access_keeps_structures_consistent() {
    const THREADS: usize = 8;
    const OPS: usize = 2_000;
    const CAPACITY: usize = 64;

    let lru = Arc::new(LruCache::new(CAPACITY));
    let lfu = Arc::new(LfuCache::new(CAPACITY));
    let manual = Arc::new(ManualCache::new(CAPACITY));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let lru = lru.clone();
            let lfu = lfu.clone();
            let manual = manual.clone();
            thread::spawn(move || {
                let caches: [&dyn Cache<String, i32>; 3] = [&*lru, &*lfu, &*manual];
                for i in 0..OPS {
                    let k = key((i * 31 + t * 7) % (CAPACITY * 2));
                    for cache in caches {
                        match i % 5 {
                            0 | 1 => cache.set(k.clone(), i as i32),
                            2 => {
                                cache.get(&k);
                            }
                            3 => {
                                let ttl = Duration::from_millis(1);
                                cache.not_found_set_with_timeout(k.clone(), i as i32, ttl);
                            }
                            _ => {
                                cache.delete(&k);
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }

    lru.check_invariants().unwrap();
    lfu.check_invariants().unwrap();
    assert!(lru.len() <= CAPACITY);
    assert!(lfu.len() <= CAPACITY);
    assert!(manual.len() <= CAPACITY);
}
