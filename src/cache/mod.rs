//! Cache Module
//!
//! Three interchangeable eviction policies behind one [`Cache`] contract,
//! each with optional per-entry expiration:
//! - [`ManualCache`]: no ordering, expired-first then arbitrary eviction
//! - [`LruCache`]: least recently used
//! - [`LfuCache`]: least frequently used, oldest first within a frequency

mod entry;
mod lfu;
mod list;
mod lru;
mod manual;
mod stats;
mod traits;
mod transfer;


// Re-export public types
pub(crate) use entry::Entry;
pub use lfu::LfuCache;
pub use lru::LruCache;
pub use manual::ManualCache;
pub use stats::CacheStats;
pub use traits::Cache;
pub use transfer::{copy, transfer};
