//! The policy-agnostic cache contract.
//!
//! [`ManualCache`](crate::cache::ManualCache),
//! [`LruCache`](crate::cache::LruCache) and
//! [`LfuCache`](crate::cache::LfuCache) all implement [`Cache`], so callers can
//! hold a `&dyn Cache<K, V>` and swap eviction policies without code changes.
//!
//! A *live* entry is one that has not been deleted and whose expiry, if any,
//! is strictly in the future. [`Cache::count`] only sees live entries while
//! [`Cache::len`] also counts expired entries nothing has removed yet, so
//! `count() <= len()` always holds.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::stats::CacheStats;
use crate::cache::transfer;

// == Cache Trait ==
/// Operations shared by every eviction policy.
///
/// Every method locks only the receiving cache, so a `Cache` can be shared
/// across threads behind an `Arc` without further synchronization.
pub trait Cache<K, V>: Send + Sync {
    /// Returns a clone of the value for `key` if it is live.
    ///
    /// An expired entry found here is removed and reported as a miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or overwrites `key` with no expiry.
    fn set(&self, key: K, value: V) {
        self.set_with_timeout(key, value, Duration::ZERO);
    }

    /// Inserts or overwrites `key`, expiring `ttl` from now.
    ///
    /// A zero `ttl` means the entry never expires.
    fn set_with_timeout(&self, key: K, value: V, ttl: Duration);

    /// Inserts `key` only if it is absent or expired. Returns whether it was inserted.
    fn not_found_set(&self, key: K, value: V) -> bool {
        self.not_found_set_with_timeout(key, value, Duration::ZERO)
    }

    /// Like [`Cache::not_found_set`], with an expiry. A zero `ttl` inserts
    /// an entry that never expires.
    fn not_found_set_with_timeout(&self, key: K, value: V, ttl: Duration) -> bool;

    /// Removes `key`. Returns whether an entry (live or expired) was stored.
    fn delete(&self, key: &K) -> bool;

    /// Snapshot of every live entry.
    fn get_all(&self) -> HashMap<K, V>;

    /// Every live key, in no particular order.
    fn keys(&self) -> Vec<K>;

    /// Removes every entry. The cache stays usable.
    fn purge(&self);

    /// Number of live entries.
    fn count(&self) -> usize;

    /// Number of stored entries, including expired ones not yet removed.
    fn len(&self) -> usize;

    /// Returns true if no entries are stored, expired ones included.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry in one critical section and returns the live ones.
    ///
    /// Expired entries are discarded rather than returned.
    fn drain(&self) -> HashMap<K, V>;

    /// Snapshot of hit, miss, eviction and expiration counters.
    fn stats(&self) -> CacheStats;

    /// Stops the background sweeper, if any, and releases every entry.
    ///
    /// Calling `close` more than once is harmless. Using a cache after close
    /// is not supported: it reads as empty and refuses writes, logging a
    /// warning for each refused write.
    fn close(&self);

    /// Moves every live entry into `dst`. Returns the number of entries moved.
    ///
    /// See [`transfer`](crate::cache::transfer()).
    fn transfer_to(&self, dst: &dyn Cache<K, V>) -> usize {
        transfer::transfer(self, dst)
    }

    /// Copies every live entry into `dst`. Returns the number of entries copied.
    ///
    /// See [`copy`](crate::cache::copy()).
    fn copy_to(&self, dst: &dyn Cache<K, V>) -> usize {
        transfer::copy(self, dst)
    }
}
