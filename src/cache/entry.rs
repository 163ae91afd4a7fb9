//! Cache Entry Module
//!
//! Defines the stored unit shared by every eviction policy.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry: key, value and optional absolute expiry.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Expiration instant, None = never expires
    pub expires_at: Option<Instant>,
}

impl<K, V> Entry<K, V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` after `now`.
    ///
    /// A zero ttl, or one too large to represent, means the entry never expires.
    pub fn new(key: K, value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            key,
            value,
            expires_at: deadline(ttl, now),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is live only while its expiry is strictly in the future, so
    /// an entry whose deadline equals `now` is already expired.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }

    /// Replaces value and expiry in place.
    pub fn update(&mut self, value: V, ttl: Duration, now: Instant) {
        self.value = value;
        self.expires_at = deadline(ttl, now);
    }
}

// == Utility Functions ==
/// Converts a relative ttl into an absolute deadline.
pub(crate) fn deadline(ttl: Duration, now: Instant) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}
