//! Configuration Module
//!
//! Construction-time settings shared by every cache policy: capacity and the
//! active expiration interval.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Environment variable holding the maximum number of entries.
pub const CAPACITY_ENV: &str = "POLYCACHE_CAPACITY";

/// Environment variable holding the sweep interval in milliseconds.
pub const CLEANUP_INTERVAL_ENV: &str = "POLYCACHE_CLEANUP_INTERVAL_MS";

const DEFAULT_CAPACITY: usize = 1000;

/// Cache configuration parameters.
///
/// A capacity of 0 is valid and disables storage entirely. A cleanup interval
/// of 0 disables the background expiration task; expired entries are then
/// only removed lazily on access or when capacity eviction needs room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Background sweep interval in milliseconds, 0 = disabled
    pub cleanup_interval_ms: u64,
}

impl CacheConfig {
    /// Creates a config with the given capacity and no background sweep.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cleanup_interval_ms: 0,
        }
    }

    /// Enables the background sweep with the given period.
    ///
    /// Sub-millisecond periods are rounded up to one millisecond; a zero
    /// period disables the sweep.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = if interval.is_zero() {
            0
        } else {
            u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1)
        };
        self
    }

    /// Returns the sweep period, or None when active expiration is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_ms > 0).then(|| Duration::from_millis(self.cleanup_interval_ms))
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `POLYCACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `POLYCACHE_CLEANUP_INTERVAL_MS` - Sweep period in ms (default: 0, disabled)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`CacheConfig::from_env`], but rejects unparsable values.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            capacity: lookup(CAPACITY_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.capacity),
            cleanup_interval_ms: lookup(CLEANUP_INTERVAL_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.cleanup_interval_ms),
        }
    }

    fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: parse_var(&lookup, CAPACITY_ENV)?.unwrap_or(defaults.capacity),
            cleanup_interval_ms: parse_var(&lookup, CLEANUP_INTERVAL_ENV)?
                .unwrap_or(defaults.cleanup_interval_ms),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::InvalidConfig(format!("{name}={raw:?} is not a valid number"))),
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cleanup_interval_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.cleanup_interval_ms, 0);
        assert!(config.cleanup_interval().is_none());
    }

    #[test]
    fn test_with_cleanup_interval() {
        let config = CacheConfig::new(10).with_cleanup_interval(Duration::from_millis(50));
        assert_eq!(config.capacity, 10);
        assert_eq!(config.cleanup_interval(), Some(Duration::from_millis(50)));

        let config = config.with_cleanup_interval(Duration::ZERO);
        assert!(config.cleanup_interval().is_none());

        let config = config.with_cleanup_interval(Duration::from_micros(10));
        assert_eq!(config.cleanup_interval_ms, 1);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = CacheConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_from_lookup_values() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            (CAPACITY_ENV, "64"),
            (CLEANUP_INTERVAL_ENV, " 250 "),
        ]));
        assert_eq!(config.capacity, 64);
        assert_eq!(config.cleanup_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = CacheConfig::from_lookup(lookup_from(&[(CAPACITY_ENV, "lots")]));
        assert_eq!(config.capacity, 1000);
    }

    #[test]
    fn test_try_from_lookup_rejects_garbage() {
        let result = CacheConfig::try_from_lookup(lookup_from(&[(CLEANUP_INTERVAL_ENV, "-5")]));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let config = CacheConfig::try_from_lookup(lookup_from(&[(CAPACITY_ENV, "0")])).unwrap();
        assert_eq!(config.capacity, 0);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig = serde_json::from_str(r#"{"capacity": 5}"#).unwrap();
        assert_eq!(config, CacheConfig::new(5));
    }
}
