//! Moving and copying entries between caches.
//!
//! Both operations take a snapshot under the source's lock, release it, and
//! only then write into the destination through its own [`Cache::set`]. No
//! code path holds two cache locks at once, so concurrent transfers in
//! opposite directions cannot deadlock, and the two sides may use different
//! eviction policies.
//!
//! Entries are written without expiry, so a moved entry lives until evicted
//! or deleted in the destination. Same-key collisions overwrite the
//! destination's value.

use tracing::debug;

use crate::cache::traits::Cache;

/// Moves every live entry from `src` into `dst`.
///
/// The source is emptied in a single critical section: live entries are
/// moved, expired ones are discarded along the way. Returns how many entries
/// were written to `dst`.
pub fn transfer<K, V, S, D>(src: &S, dst: &D) -> usize
where
    S: Cache<K, V> + ?Sized,
    D: Cache<K, V> + ?Sized,
{
    let snapshot = src.drain();
    let moved = snapshot.len();
    for (key, value) in snapshot {
        dst.set(key, value);
    }
    debug!("Transferred {} entries", moved);
    moved
}

/// Copies every live entry from `src` into `dst`, leaving `src` unchanged.
///
/// Returns how many entries were written to `dst`.
pub fn copy<K, V, S, D>(src: &S, dst: &D) -> usize
where
    S: Cache<K, V> + ?Sized,
    D: Cache<K, V> + ?Sized,
{
    let snapshot = src.get_all();
    let copied = snapshot.len();
    for (key, value) in snapshot {
        dst.set(key, value);
    }
    debug!("Copied {} entries", copied);
    copied
}
