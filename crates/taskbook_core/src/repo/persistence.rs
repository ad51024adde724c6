//! Typed read/write of store collections over a key/value store.
//!
//! # Responsibility
//! - Map each collection to one namespaced key.
//! - Decode on load with fallback to defaults; encode on save.
//!
//! # Invariants
//! - Load never fails: absent, unreadable or corrupt values yield the default.
//! - Save failures are returned to the caller and never touch memory state.

use crate::repo::kv_repo::{KvError, KvResult, KvStore};
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "taskbook_v1";

/// A collection could not be written.
#[derive(Debug)]
pub enum PersistError {
    Encode { key: String, reason: String },
    Write { key: String, source: KvError },
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode { key, reason } => write!(f, "failed to encode `{key}`: {reason}"),
            Self::Write { key, source } => write!(f, "failed to write `{key}`: {source}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode { .. } => None,
            Self::Write { source, .. } => Some(source),
        }
    }
}

/// JSON codec plus key namespacing in front of a `KvStore`.
pub struct PersistenceAdapter<S: KvStore> {
    store: S,
    prefix: String,
}

impl<S: KvStore> PersistenceAdapter<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full storage key for `key` under this adapter's prefix.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    /// Returns whether anything is stored under `key`.
    ///
    /// # Errors
    /// - The backend read error; callers must not treat it as absence.
    pub fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(self.store.get(&self.full_key(key))?.is_some())
    }

    /// Reads and decodes `key`, or returns `default`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let full_key = self.full_key(key);
        let raw = match self.store.get(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(err) => {
                warn!(
                    "event=persist_load_fallback module=repo status=error key={full_key} reason=read_failed error={err}"
                );
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=persist_load_fallback module=repo status=error key={full_key} reason=decode_failed error={err}"
                );
                default
            }
        }
    }

    /// Encodes and writes `value` under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistError> {
        let full_key = self.full_key(key);
        let encoded = serde_json::to_string(value).map_err(|err| PersistError::Encode {
            key: full_key.clone(),
            reason: err.to_string(),
        })?;

        self.store.put(&full_key, &encoded).map_err(|source| {
            error!(
                "event=persist_write module=repo status=error key={full_key} error={source}"
            );
            PersistError::Write {
                key: full_key.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PersistenceAdapter;
    use crate::repo::kv_repo::{KvStore, MemoryKvStore};

    #[test]
    fn keys_are_namespaced() {
        let adapter = PersistenceAdapter::new(MemoryKvStore::new(), "app");
        adapter.save("lists", &vec!["a".to_string()]).unwrap();
        assert_eq!(adapter.store().keys().unwrap(), vec!["app:lists"]);
        assert!(adapter.contains("lists").unwrap());
        assert!(!adapter.contains("tags").unwrap());
    }

    #[test]
    fn corrupt_and_missing_values_fall_back() {
        let adapter = PersistenceAdapter::new(MemoryKvStore::new(), "app");
        adapter.store().put("app:tags", "{not json").unwrap();

        let fallback = vec!["default".to_string()];
        assert_eq!(adapter.load("tags", fallback.clone()), fallback);
        assert_eq!(adapter.load("lists", fallback.clone()), fallback);
    }

    #[test]
    fn saved_value_loads_back() {
        let adapter = PersistenceAdapter::new(MemoryKvStore::new(), "app");
        adapter.save("tags", &["x".to_string(), "y".to_string()]).unwrap();
        let loaded: Vec<String> = adapter.load("tags", Vec::new());
        assert_eq!(loaded, vec!["x", "y"]);
    }

    #[test]
    fn read_failure_is_not_absence() {
        let adapter = PersistenceAdapter::new(MemoryKvStore::new(), "app");
        adapter.save("lists", &vec!["a".to_string()]).unwrap();
        adapter.store().set_reject_reads(true);
        assert!(adapter.contains("lists").is_err());
        assert!(adapter.contains("tags").is_err());
    }

    #[test]
    fn write_failure_is_reported() {
        let adapter = PersistenceAdapter::new(MemoryKvStore::new(), "app");
        adapter.store().set_reject_writes(true);
        let err = adapter.save("tags", &Vec::<String>::new()).unwrap_err();
        assert!(err.to_string().contains("app:tags"));
    }
}
