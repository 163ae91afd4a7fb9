//! LRU Cache Module
//!
//! Least Recently Used eviction in O(1).
//!
//! Entries live in a [`SlotArena`] threaded by a single recency [`List`]:
//! - Front = Most recently used
//! - Back = Least recently used
//!
//! The key map stores slot ids, so a hit moves its node to the front without
//! searching, and eviction pops the back. Eviction is purely positional: the
//! least recently touched entry goes even if it is still live.

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

/// Upper bound on slots reserved up front; larger caches grow on demand.
const PREALLOCATE_LIMIT: usize = 1024;

// == LRU State ==
#[derive(Debug)]
struct LruState<K, V> {
    capacity: usize,
    map: HashMap<K, SlotId>,
    arena: SlotArena<Entry<K, V>>,
    order: List,
    stats: CacheStats,
    closed: bool,
}

impl<K, V> LruState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            arena: SlotArena::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            order: List::new(),
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
            .map_or(true, |entry| entry.is_expired_at(now))
    }

    fn remove_slot(&mut self, id: SlotId) -> Option<Entry<K, V>> {
        let entry = self.arena.remove(&mut self.order, id)?;
        self.map.remove(&entry.key);
        Some(entry)
    }

    // == Insert ==
    fn insert(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        if let Some(&id) = self.map.get(&key) {
            if let Some(entry) = self.arena.get_mut(id) {
                entry.update(value, ttl, now);
            }
            self.arena.move_to_front(&mut self.order, id);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict_oldest();
        }

        let id = self
            .arena
            .push_front(&mut self.order, Entry::new(key.clone(), value, ttl, now));
        self.map.insert(key, id);
    }

    // == Evict Oldest ==
    fn evict_oldest(&mut self) {
        if let Some(id) = self.order.back() {
            if self.remove_slot(id).is_some() {
                self.stats.record_eviction();
                debug!("LRU eviction: dropped least recently used entry");
            }
        }
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<SlotId> = self
            .arena
            .iter(&self.order)
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(id, _)| id)
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
        self.order = List::new();
    }

    fn check_invariants(&self) -> std::result::Result<(), String> {
        self.arena.validate(&self.order)?;
        if self.order.len() != self.map.len() {
            return Err(format!(
                "recency list holds {} nodes but map holds {} keys",
                self.order.len(),
                self.map.len()
            ));
        }
        if self.arena.len() != self.map.len() {
            return Err(format!(
                "arena holds {} slots but map holds {} keys",
                self.arena.len(),
                self.map.len()
            ));
        }
        for (id, entry) in self.arena.iter(&self.order) {
            if self.map.get(&entry.key) != Some(&id) {
                return Err(format!("map does not point at slot {:?}", id));
            }
        }
        Ok(())
    }
}

impl<K, V> Sweep for LruState<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_expired(&mut self, now: Instant) -> usize {
        self.remove_expired(now)
    }
}

// == LRU Cache ==
/// Thread-safe cache evicting the least recently used entry.
///
/// Both [`Cache::get`] and [`Cache::set`] count as a use.
///
/// # Example
/// ```
/// use polycache::cache::{Cache, LruCache};
///
/// let cache = LruCache::new(2);
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.get(&"a");
/// cache.set("c", 3);
///
/// assert_eq!(cache.get(&"b"), None);
/// assert_eq!(cache.get(&"a"), Some(1));
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    state: Arc<RwLock<LruState<K, V>>>,
    sweeper: Option<Sweeper>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, without a
    /// background sweeper. A capacity of 0 stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(LruState::new(capacity))),
            sweeper: None,
        }
    }

    /// Creates a cache from `config`, starting the background sweeper when a
    /// cleanup interval is set.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let state = Arc::new(RwLock::new(LruState::new(config.capacity)));
        let sweeper = config
            .cleanup_interval()
            .map(|period| Sweeper::spawn(&state, period))
            .transpose()?;
        Ok(Self { state, sweeper })
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    /// Keys from most to least recently used, expired entries included.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let state = self.state.read();
        state
            .arena
            .iter(&state.order)
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    /// Verifies that the recency list and the key map agree.
    pub fn check_invariants(&self) -> Result<()> {
        self.state
            .read()
            .check_invariants()
            .map_err(CacheError::Invariant)
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
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

        state.arena.move_to_front(&mut state.order, id);
        state.stats.record_hit();
        state.arena.get(id).map(|entry| entry.value.clone())
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
            .arena
            .iter(&state.order)
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(_, entry)| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    fn keys(&self) -> Vec<K> {
        let state = self.state.read();
        let now = Instant::now();
        state
            .arena
            .iter(&state.order)
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    fn purge(&self) {
        self.state.write().clear();
    }

    fn count(&self) -> usize {
        let state = self.state.read();
        let now = Instant::now();
        state
            .arena
            .iter(&state.order)
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .count()
    }

    fn len(&self) -> usize {
        self.state.read().map.len()
    }

    fn drain(&self) -> HashMap<K, V> {
        let mut state = self.state.write();
        let now = Instant::now();

        let entries = state.arena.drain_values();
        state.map.clear();
        state.order = List::new();

        let total = entries.len();
        let live: HashMap<K, V> = entries
            .into_iter()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| (entry.key, entry.value))
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
        state.order = List::new();
    }
}
