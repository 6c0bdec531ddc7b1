//! # Data Dictionary Module
//!
//! Named, string-keyed TTL dictionaries plus a directory to look them up by key.
//!
//! ## Overview
//!
//! A [`DataDict`] is a thin, named wrapper over [`TtlCache`]: entries expire
//! after the configured TTL (default 10 minutes) and the dictionary holds at
//! most the configured capacity (default 1024), evicting the least recently
//! used entry. Insertions, updates and evictions are logged with the
//! dictionary name.
//!
//! A [`DictDirectory`] maps [`DictKey`]s to type-erased dictionaries
//! ([`AnyDict`]). It is an explicit object rather than a process global; build
//! one at startup and share it by handle.
//!
//! ```rust
//! use puzzle::dict::{DataDict, DictDirectory, DictKey, CONFIG_DICT};
//!
//! let directory = DictDirectory::new();
//! let dict = DataDict::new(CONFIG_DICT);
//! directory.put(dict.name().clone(), dict);
//!
//! let config = directory.get(&DictKey::from(CONFIG_DICT)).unwrap();
//! config.record_value("SERVER_ADDR", "0.0.0.0:3333".to_string());
//! assert_eq!(
//!     config.find_as::<String>("SERVER_ADDR").as_deref().map(String::as_str),
//!     Some("0.0.0.0:3333")
//! );
//! ```

use crate::runtime_config::{RuntimeConfig, DEFAULT_DICT_CAPACITY, DEFAULT_DICT_TTL_SECS};
use crate::ttl::TtlCache;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Key of the configuration dictionary.
pub const CONFIG_DICT: &str = "_dict_config_";
/// Key of the command dictionary.
pub const COMMAND_DICT: &str = "_dict_command_";

/// Name of a dictionary inside a [`DictDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DictKey(String);

impl DictKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DictKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for DictKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for DictKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned by [`DictDirectory::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    /// No dictionary is registered under the key
    NotFound { key: DictKey },
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictError::NotFound { key } => {
                write!(f, "[dict] no data dictionary registered under '{}'", key)
            }
        }
    }
}

impl std::error::Error for DictError {}

/// A named TTL dictionary with string keys.
///
/// Cloning yields another handle to the same entries.
#[derive(Clone)]
pub struct DataDict<V> {
    name: DictKey,
    entries: TtlCache<String, V>,
}

impl<V: Clone> fmt::Debug for DataDict<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataDict")
            .field("name", &self.name)
            .field("ttl", &self.entries.ttl())
            .finish_non_exhaustive()
    }
}

fn capacity_or_default(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity)
        .or(NonZeroUsize::new(DEFAULT_DICT_CAPACITY))
        .unwrap_or(NonZeroUsize::MIN)
}

impl<V: Clone> DataDict<V> {
    /// Dictionary with the default TTL (10 minutes) and capacity (1024).
    pub fn new(name: impl Into<DictKey>) -> Self {
        Self::with_limits(
            name,
            Duration::from_secs(DEFAULT_DICT_TTL_SECS),
            DEFAULT_DICT_CAPACITY,
        )
    }

    /// Dictionary sized from runtime configuration.
    pub fn with_config(name: impl Into<DictKey>, config: &RuntimeConfig) -> Self {
        Self::with_limits(name, config.dict_ttl, config.dict_capacity)
    }

    /// Dictionary with explicit limits; a zero capacity means the default.
    pub fn with_limits(name: impl Into<DictKey>, ttl: Duration, capacity: usize) -> Self {
        let name = name.into();
        let entries = TtlCache::new(name.as_str(), ttl, capacity_or_default(capacity));
        Self { name, entries }
    }

    pub fn name(&self) -> &DictKey {
        &self.name
    }

    /// Insert or replace `key`, restarting its TTL.
    ///
    /// Returns the previous live value.
    pub fn record(&self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Live value under `key`.
    pub fn find(&self, key: &str) -> Option<V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn remove_all(&self) {
        self.entries.clear();
    }

    /// Drop expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared, type-erased dictionary value.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// The dictionary type stored in a [`DictDirectory`].
pub type AnyDict = DataDict<AnyValue>;

impl AnyDict {
    /// Record any sendable value.
    pub fn record_value<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.record(key, Arc::new(value));
    }

    /// Live value under `key` if it holds a `T`.
    pub fn find_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.find(key).and_then(|value| value.downcast::<T>().ok())
    }
}

/// Directory of type-erased dictionaries.
///
/// Cloning yields another handle to the same directory.
#[derive(Debug, Clone, Default)]
pub struct DictDirectory {
    dicts: Arc<DashMap<DictKey, AnyDict>>,
}

impl DictDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dict` under `key`, replacing any previous dictionary.
    pub fn put(&self, key: impl Into<DictKey>, dict: AnyDict) {
        let key = key.into();
        let replaced = self.dicts.insert(key.clone(), dict).is_some();
        debug!(dict = %key, replaced, "Data dictionary registered");
    }

    /// Dictionary registered under `key`.
    ///
    /// # Errors
    ///
    /// [`DictError::NotFound`] when nothing is registered under `key`.
    pub fn get(&self, key: &DictKey) -> Result<AnyDict, DictError> {
        self.dicts
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DictError::NotFound { key: key.clone() })
    }

    /// Dictionary under `key`, created with `make` when absent.
    pub fn get_or_insert_with<F>(&self, key: impl Into<DictKey>, make: F) -> AnyDict
    where
        F: FnOnce(&DictKey) -> AnyDict,
    {
        let key = key.into();
        self.dicts
            .entry(key.clone())
            .or_insert_with(|| make(&key))
            .value()
            .clone()
    }

    pub fn remove(&self, key: &DictKey) -> Option<AnyDict> {
        self.dicts.remove(key).map(|(_, dict)| dict)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<DictKey> {
        let mut keys: Vec<DictKey> = self
            .dicts
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.dicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Env {
        env: String,
        id: u32,
    }

    #[test]
    fn test_record_update_and_find() {
        let dict: DataDict<String> = DataDict::new("_system_");
        assert_eq!(dict.record("SERVER_ADDR", "127.0.0.1:3333".to_string()), None);
        assert_eq!(
            dict.record("SERVER_ADDR", "0.0.0.0:3333".to_string()),
            Some("127.0.0.1:3333".to_string())
        );
        assert_eq!(dict.find("SERVER_ADDR").as_deref(), Some("0.0.0.0:3333"));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.name().as_str(), "_system_");
    }

    #[test]
    fn test_remove_and_remove_all() {
        let dict: DataDict<u32> = DataDict::new("nums");
        dict.record("a", 1);
        dict.record("b", 2);
        assert_eq!(dict.remove("a"), Some(1));
        assert!(!dict.contains("a"));
        dict.remove_all();
        assert!(dict.is_empty());
    }

    #[test]
    fn test_entries_expire() {
        let dict: DataDict<u32> = DataDict::with_limits("short", Duration::from_millis(10), 4);
        dict.record("a", 1);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(dict.find("a"), None);
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(capacity_or_default(0).get(), DEFAULT_DICT_CAPACITY);
        assert_eq!(capacity_or_default(3).get(), 3);
    }

    #[test]
    fn test_find_as_downcasts() {
        let dict = AnyDict::new("_system_");
        dict.record_value(
            "SYSTEM_ENV_DEV",
            Env {
                env: "dev".to_string(),
                id: 1 << 10,
            },
        );
        let env = dict.find_as::<Env>("SYSTEM_ENV_DEV").unwrap();
        assert_eq!(env.id, 1024);
        assert_eq!(env.env, "dev");
        assert!(dict.find_as::<String>("SYSTEM_ENV_DEV").is_none());
    }

    #[test]
    fn test_directory_put_get_remove() {
        let directory = DictDirectory::new();
        let key = DictKey::from(CONFIG_DICT);
        directory.put(key.clone(), AnyDict::new(CONFIG_DICT));
        assert!(directory.get(&key).is_ok());
        assert_eq!(directory.keys(), vec![key.clone()]);

        let err = directory.get(&DictKey::from("bad_key")).unwrap_err();
        assert_eq!(err.to_string(), "[dict] no data dictionary registered under 'bad_key'");

        assert!(directory.remove(&key).is_some());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_directory_handles_share_dictionaries() {
        let directory = DictDirectory::new();
        let handle = directory.clone();
        let dict = handle.get_or_insert_with(COMMAND_DICT, |key| AnyDict::new(key.clone()));
        dict.record_value("serve", 1u8);
        let again = directory
            .get(&DictKey::from(COMMAND_DICT))
            .unwrap()
            .find_as::<u8>("serve");
        assert_eq!(again.as_deref(), Some(&1));
    }
}
