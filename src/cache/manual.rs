//! Manual Cache Module
//!
//! A capacity-bounded map with no intrinsic ordering. When a new key arrives
//! at capacity, expired entries are dropped first; only if that frees nothing
//! are arbitrary live entries removed.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::{Cache, CacheStats, Entry};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{Sweep, Sweeper};

// == Manual State ==
#[derive(Debug)]
struct ManualState<K, V> {
    capacity: usize,
    entries: HashMap<K, Entry<K, V>>,
    stats: CacheStats,
    closed: bool,
}

impl<K, V> ManualState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            stats: CacheStats::new(),
            closed: false,
        }
    }

    fn accepts_writes(&self) -> bool {
        if self.closed {
            warn!("Write to a closed cache ignored");
            return false;
        }
        self.capacity > 0
    }

    // == Insert ==
    fn insert(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.update(value, ttl, now);
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict(now);
        }
        self.entries
            .insert(key.clone(), Entry::new(key, value, ttl, now));
    }

    // == Evict ==
    /// Frees exactly enough room for one new key: every expired entry goes
    /// first, then arbitrary entries until a slot is free.
    fn evict(&mut self, now: Instant) {
        let expired = self.remove_expired(now);

        let mut evicted = 0;
        while self.entries.len() >= self.capacity {
            let Some(key) = self.entries.keys().next().cloned() else {
                break;
            };
            self.entries.remove(&key);
            self.stats.record_eviction();
            evicted += 1;
        }

        debug!(
            "Manual eviction: dropped {} expired and {} live entries",
            expired, evicted
        );
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        removed
    }
}

impl<K, V> Sweep for ManualState<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_expired(&mut self, now: Instant) -> usize {
        self.remove_expired(now)
    }
}

// == Manual Cache ==
/// Thread-safe cache with expired-first, then arbitrary, eviction.
///
/// # Example
/// ```
/// use polycache::cache::{Cache, ManualCache};
///
/// let cache = ManualCache::new(2);
/// cache.set("a", 1);
/// assert_eq!(cache.get(&"a"), Some(1));
/// assert!(!cache.not_found_set("a", 2));
/// ```
#[derive(Debug)]
pub struct ManualCache<K, V> {
    state: Arc<RwLock<ManualState<K, V>>>,
    sweeper: Option<Sweeper>,
}

impl<K, V> ManualCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, without a
    /// background sweeper. A capacity of 0 stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(ManualState::new(capacity))),
            sweeper: None,
        }
    }

    /// Creates a cache from `config`, starting the background sweeper when a
    /// cleanup interval is set.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let state = Arc::new(RwLock::new(ManualState::new(config.capacity)));
        let sweeper = config
            .cleanup_interval()
            .map(|period| Sweeper::spawn(&state, period))
            .transpose()?;
        Ok(Self { state, sweeper })
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    fn store_if_absent(&self, key: K, value: V, ttl: Duration) -> bool {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.accepts_writes() {
            return false;
        }

        let now = Instant::now();
        if let Some(entry) = state.entries.get(&key) {
            if !entry.is_expired_at(now) {
                return false;
            }
            state.entries.remove(&key);
            state.stats.record_expirations(1);
        }
        state.insert(key, value, ttl, now);
        true
    }
}

impl<K, V> Cache<K, V> for ManualCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = Instant::now();

        let expired = match state.entries.get(key) {
            None => {
                state.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            state.entries.remove(key);
            state.stats.record_expirations(1);
            state.stats.record_miss();
            trace!("Lazily expired entry on get");
            return None;
        }

        state.stats.record_hit();
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    fn set_with_timeout(&self, key: K, value: V, ttl: Duration) {
        let mut state = self.state.write();
        if state.accepts_writes() {
            state.insert(key, value, ttl, Instant::now());
        }
    }

    fn not_found_set_with_timeout(&self, key: K, value: V, ttl: Duration) -> bool {
        self.store_if_absent(key, value, ttl)
    }

    fn delete(&self, key: &K) -> bool {
        self.state.write().entries.remove(key).is_some()
    }

    fn get_all(&self) -> HashMap<K, V> {
        let state = self.state.read();
        let now = Instant::now();
        state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    fn keys(&self) -> Vec<K> {
        let state = self.state.read();
        let now = Instant::now();
        state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn purge(&self) {
        self.state.write().entries.clear();
    }

    fn count(&self) -> usize {
        let state = self.state.read();
        let now = Instant::now();
        state
            .entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    fn drain(&self) -> HashMap<K, V> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = Instant::now();
        let entries = std::mem::take(&mut state.entries);

        let total = entries.len();
        let live: HashMap<K, V> = entries
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key, entry.value))
            .collect();
        state.stats.record_expirations(total - live.len());
        live
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.read();
        state.stats.snapshot(state.entries.len())
    }

    fn close(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
        let mut state = self.state.write();
        state.closed = true;
        state.entries = HashMap::new();
    }
}
