//! # Runtime Configuration Module
//!
//! Environment variable based tuning for the library's caches.
//!
//! ## Environment Variables
//!
//! ### `PUZZLE_COPIER_CACHE_TTL_SECS`
//!
//! Lifetime of a compiled copier in the type-pair cache. Default: `1800` (30 minutes).
//!
//! ### `PUZZLE_COPIER_CACHE_CAPACITY`
//!
//! Maximum number of cached copiers. Default: `128`.
//!
//! ### `PUZZLE_DICT_TTL_SECS`
//!
//! Lifetime of a data dictionary entry. Default: `600` (10 minutes).
//!
//! ### `PUZZLE_DICT_CAPACITY`
//!
//! Maximum number of entries per data dictionary. Default: `1024`.
//!
//! Values that are missing or do not parse as unsigned integers fall back to
//! their defaults.
//!
//! ## Usage
//!
//! ```rust
//! use puzzle::copier::CopierCache;
//! use puzzle::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! let cache = CopierCache::from_config(&config);
//! assert_eq!(cache.size(), 0);
//! ```
//!
//! ```bash
//! # Keep compiled copiers for an hour
//! export PUZZLE_COPIER_CACHE_TTL_SECS=3600
//! ```

use std::env;
use std::time::Duration;

pub const DEFAULT_COPIER_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_COPIER_CACHE_CAPACITY: usize = 128;
pub const DEFAULT_DICT_TTL_SECS: u64 = 10 * 60;
pub const DEFAULT_DICT_CAPACITY: usize = 1 << 10;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] and hand it to
/// [`CopierCache::from_config`](crate::copier::CopierCache::from_config) and
/// [`DataDict::with_config`](crate::dict::DataDict::with_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Type-pair cache entry lifetime (default: 30 minutes)
    pub copier_cache_ttl: Duration,
    /// Type-pair cache capacity (default: 128)
    pub copier_cache_capacity: usize,
    /// Data dictionary entry lifetime (default: 10 minutes)
    pub dict_ttl: Duration,
    /// Data dictionary capacity (default: 1024)
    pub dict_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            copier_cache_ttl: Duration::from_secs(DEFAULT_COPIER_CACHE_TTL_SECS),
            copier_cache_capacity: DEFAULT_COPIER_CACHE_CAPACITY,
            dict_ttl: Duration::from_secs(DEFAULT_DICT_TTL_SECS),
            dict_capacity: DEFAULT_DICT_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        };
        let size = |key: &str, default: usize| -> usize {
            lookup(key)
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        };
        RuntimeConfig {
            copier_cache_ttl: Duration::from_secs(number(
                "PUZZLE_COPIER_CACHE_TTL_SECS",
                DEFAULT_COPIER_CACHE_TTL_SECS,
            )),
            copier_cache_capacity: size(
                "PUZZLE_COPIER_CACHE_CAPACITY",
                DEFAULT_COPIER_CACHE_CAPACITY,
            ),
            dict_ttl: Duration::from_secs(number("PUZZLE_DICT_TTL_SECS", DEFAULT_DICT_TTL_SECS)),
            dict_capacity: size("PUZZLE_DICT_CAPACITY", DEFAULT_DICT_CAPACITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(RuntimeConfig::from_lookup(lookup(&[])), RuntimeConfig::default());
    }

    #[test]
    fn test_values_are_read() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("PUZZLE_COPIER_CACHE_TTL_SECS", "60"),
            ("PUZZLE_COPIER_CACHE_CAPACITY", " 16 "),
            ("PUZZLE_DICT_TTL_SECS", "5"),
            ("PUZZLE_DICT_CAPACITY", "2"),
        ]));
        assert_eq!(config.copier_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.copier_cache_capacity, 16);
        assert_eq!(config.dict_ttl, Duration::from_secs(5));
        assert_eq!(config.dict_capacity, 2);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("PUZZLE_COPIER_CACHE_TTL_SECS", "-1"),
            ("PUZZLE_DICT_CAPACITY", "lots"),
        ]));
        assert_eq!(config.copier_cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.dict_capacity, 1024);
    }
}
