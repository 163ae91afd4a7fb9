//! Polycache - A thread-safe in-process cache
//!
//! Provides manual, LRU and LFU eviction behind one contract, with per-entry
//! TTL, optional background expiration, and deadlock-free transfer between
//! caches.
//!
//! ```
//! use std::time::Duration;
//! use polycache::{Cache, LfuCache, LruCache};
//!
//! let hot = LruCache::new(100);
//! let cold = LfuCache::new(1000);
//!
//! hot.set_with_timeout("session", 42, Duration::from_secs(30));
//! hot.transfer_to(&cold);
//!
//! assert_eq!(cold.get(&"session"), Some(42));
//! assert!(hot.is_empty());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, LfuCache, LruCache, ManualCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
