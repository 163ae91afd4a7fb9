//! LFU Cache Module
//!
//! Least Frequently Used eviction in O(1) amortized time.
//!
//! ```text
//!   buckets:  freq 1: [ d ]            <- min_freq
//!             freq 2: [ b ]
//!             freq 3: [ a ]
//!   each bucket is a recency list: front = newest, back = oldest
//! ```
//!
//! Every entry sits in the bucket matching its access count. A hit unlinks
//! the node from bucket `f` and links it at the front of bucket `f + 1`.
//! Eviction takes the back of the `min_freq` bucket: lowest frequency first,
//! oldest within that frequency.
//!
//! `min_freq` is exact after inserts and hits. Deletes and expirations may
//! empty the minimum bucket and leave it stale; the next eviction then
//! recomputes it from the distinct frequencies still present.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::list::{List, SlotArena, SlotId};
use crate::cache::{Cache, CacheStats, Entry};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{Sweep, Sweeper};

const PREALLOCATE_LIMIT: usize = 1024;

#[derive(Debug)]
struct LfuItem<K, V> {
    entry: Entry<K, V>,
    freq: u64,
}

// == LFU State ==
#[derive(Debug)]
struct LfuState<K, V> {
    capacity: usize,
    map: HashMap<K, SlotId>,
    arena: SlotArena<LfuItem<K, V>>,
    buckets: HashMap<u64, List>,
    min_freq: u64,
    stats: CacheStats,
    closed: bool,
}

impl<K, V> LfuState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            arena: SlotArena::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            buckets: HashMap::new(),
            min_freq: 0,
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

    fn is_expired(&self, id: SlotId, now: Instant) -> bool {
        self.arena
            .get(id)
            .map_or(true, |item| item.entry.is_expired_at(now))
    }

    /// Unlinks `id` from its bucket, dropping the bucket once empty.
    /// Returns true if that emptied the bucket.
    fn detach(&mut self, id: SlotId, freq: u64) -> bool {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return false;
        };
        self.arena.unlink(bucket, id);
        let emptied = bucket.is_empty();
        if emptied {
            self.buckets.remove(&freq);
        }
        emptied
    }

    fn remove_slot(&mut self, id: SlotId) -> Option<LfuItem<K, V>> {
        let freq = self.arena.get(id)?.freq;
        let bucket = self.buckets.get_mut(&freq)?;
        let item = self.arena.remove(bucket, id)?;
        let emptied = bucket.is_empty();
        if emptied {
            // min_freq may now be stale; evict() recomputes it
            self.buckets.remove(&freq);
        }
        self.map.remove(&item.entry.key);
        Some(item)
    }

    // == Increment Frequency ==
    fn touch(&mut self, id: SlotId) {
        let Some(freq) = self.arena.get(id).map(|item| item.freq) else {
            return;
        };
        let next = freq.saturating_add(1);
        if next == freq {
            if let Some(bucket) = self.buckets.get_mut(&freq) {
                self.arena.move_to_front(bucket, id);
            }
            return;
        }

        if self.detach(id, freq) && self.min_freq == freq {
            self.min_freq = next;
        }
        if let Some(item) = self.arena.get_mut(id) {
            item.freq = next;
        }
        let bucket = self.buckets.entry(next).or_default();
        self.arena.link_front(bucket, id);
    }

    // == Insert ==
    fn insert(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        if let Some(&id) = self.map.get(&key) {
            if let Some(item) = self.arena.get_mut(id) {
                item.entry.update(value, ttl, now);
            }
            self.touch(id);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict();
        }

        let item = LfuItem {
            entry: Entry::new(key.clone(), value, ttl, now),
            freq: 1,
        };
        let bucket = self.buckets.entry(1).or_default();
        let id = self.arena.push_front(bucket, item);
        self.map.insert(key, id);
        self.min_freq = 1;
    }

    // == Evict ==
    /// Removes the oldest entry of the lowest populated frequency.
    fn evict(&mut self) {
        if self.map.is_empty() {
            return;
        }
        if !self.buckets.contains_key(&self.min_freq) {
            match self.buckets.keys().min() {
                Some(&freq) => self.min_freq = freq,
                None => return,
            }
        }

        let victim = self.buckets.get(&self.min_freq).and_then(|b| b.back());
        if let Some(item) = victim.and_then(|id| self.remove_slot(id)) {
            self.stats.record_eviction();
            debug!("LFU eviction: dropped entry with frequency {}", item.freq);
        }
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<SlotId> = self
            .map
            .values()
            .copied()
            .filter(|&id| self.is_expired(id, now))
            .collect();

        for &id in &expired {
            self.remove_slot(id);
        }
        self.stats.record_expirations(expired.len());
        expired.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.arena.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }

    fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut linked = 0;
        for (&freq, bucket) in &self.buckets {
            if bucket.is_empty() {
                return Err(format!("empty bucket for frequency {} was kept", freq));
            }
            self.arena.validate(bucket)?;
            for (id, item) in self.arena.iter(bucket) {
                if item.freq != freq {
                    return Err(format!(
                        "entry with frequency {} sits in bucket {}",
                        item.freq, freq
                    ));
                }
                if self.map.get(&item.entry.key) != Some(&id) {
                    return Err(format!("map does not point at slot {:?}", id));
                }
            }
            linked += bucket.len();
        }

        if linked != self.map.len() || self.arena.len() != self.map.len() {
            return Err(format!(
                "buckets hold {} nodes, arena {} slots, map {} keys",
                linked,
                self.arena.len(),
                self.map.len()
            ));
        }
        if let Some(&lowest) = self.buckets.keys().min() {
            if self.min_freq > lowest {
                return Err(format!(
                    "min_freq {} is above the lowest populated frequency {}",
                    self.min_freq, lowest
                ));
            }
        }
        Ok(())
    }
}

impl<K, V> Sweep for LfuState<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_expired(&mut self, now: Instant) -> usize {
        self.remove_expired(now)
    }
}

// == LFU Cache ==
/// Thread-safe cache evicting the least frequently used entry.
///
/// Every hit and every overwrite increments an entry's frequency. Among
/// entries with the lowest frequency, the one touched longest ago is evicted.
///
/// # Example
/// ```
/// use polycache::cache::{Cache, LfuCache};
///
/// let cache = LfuCache::new(2);
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.get(&"a");
/// cache.set("c", 3);
///
/// assert_eq!(cache.get(&"b"), None);
/// assert_eq!(cache.frequency(&"a"), Some(2));
/// ```
#[derive(Debug)]
pub struct LfuCache<K, V> {
    state: Arc<RwLock<LfuState<K, V>>>,
    sweeper: Option<Sweeper>,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, without a
    /// background sweeper. A capacity of 0 stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(LfuState::new(capacity))),
            sweeper: None,
        }
    }

    /// Creates a cache from `config`, starting the background sweeper when a
    /// cleanup interval is set.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let state = Arc::new(RwLock::new(LfuState::new(config.capacity)));
        let sweeper = config
            .cleanup_interval()
            .map(|period| Sweeper::spawn(&state, period))
            .transpose()?;
        Ok(Self { state, sweeper })
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    /// Current access count of `key` without touching it. Expired entries
    /// not yet removed still report their count.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let state = self.state.read();
        let id = state.map.get(key)?;
        state.arena.get(*id).map(|item| item.freq)
    }

    /// Verifies bucket membership, list links and the cached minimum frequency.
    pub fn check_invariants(&self) -> Result<()> {
        self.state
            .read()
            .check_invariants()
            .map_err(CacheError::Invariant)
    }
}

impl<K, V> Cache<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let now = Instant::now();

        let Some(&id) = state.map.get(key) else {
            state.stats.record_miss();
            return None;
        };

        if state.is_expired(id, now) {
            state.remove_slot(id);
            state.stats.record_expirations(1);
            state.stats.record_miss();
            trace!("Lazily expired entry on get");
            return None;
        }

        state.touch(id);
        state.stats.record_hit();
        state.arena.get(id).map(|item| item.entry.value.clone())
    }

    fn set_with_timeout(&self, key: K, value: V, ttl: Duration) {
        let mut state = self.state.write();
        if state.accepts_writes() {
            state.insert(key, value, ttl, Instant::now());
        }
    }

    fn not_found_set_with_timeout(&self, key: K, value: V, ttl: Duration) -> bool {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.accepts_writes() {
            return false;
        }

        let now = Instant::now();
        if let Some(&id) = state.map.get(&key) {
            if !state.is_expired(id, now) {
                return false;
            }
            state.remove_slot(id);
            state.stats.record_expirations(1);
        }
        state.insert(key, value, ttl, now);
        true
    }

    fn delete(&self, key: &K) -> bool {
        let mut state = self.state.write();
        match state.map.get(key).copied() {
            Some(id) => state.remove_slot(id).is_some(),
            None => false,
        }
    }

    fn get_all(&self) -> HashMap<K, V> {
        let state = self.state.read();
        let now = Instant::now();
        state
            .map
            .values()
            .filter_map(|&id| state.arena.get(id))
            .filter(|item| !item.entry.is_expired_at(now))
            .map(|item| (item.entry.key.clone(), item.entry.value.clone()))
            .collect()
    }

    fn keys(&self) -> Vec<K> {
        let state = self.state.read();
        let now = Instant::now();
        state
            .map
            .iter()
            .filter(|&(_, &id)| !state.is_expired(id, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn purge(&self) {
        self.state.write().clear();
    }

    fn count(&self) -> usize {
        let state = self.state.read();
        let now = Instant::now();
        state
            .map
            .values()
            .filter(|&&id| !state.is_expired(id, now))
            .count()
    }

    fn len(&self) -> usize {
        self.state.read().map.len()
    }

    fn drain(&self) -> HashMap<K, V> {
        let mut state = self.state.write();
        let now = Instant::now();

        let items = state.arena.drain_values();
        state.map.clear();
        state.buckets.clear();
        state.min_freq = 0;

        let total = items.len();
        let live: HashMap<K, V> = items
            .into_iter()
            .filter(|item| !item.entry.is_expired_at(now))
            .map(|item| (item.entry.key, item.entry.value))
            .collect();
        state.stats.record_expirations(total - live.len());
        live
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.read();
        state.stats.snapshot(state.map.len())
    }

    fn close(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
        let mut state = self.state.write();
        state.closed = true;
        state.map = HashMap::new();
        state.arena = SlotArena::new();
        state.buckets = HashMap::new();
        state.min_freq = 0;
    }
}
