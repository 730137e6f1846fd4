//! Persistent key-value storage
//!
//! The timer persists two small JSON blobs: the user settings and the
//! session log. Anything that can load and save a JSON value by key can
//! back them.
//! - File store: <data>/store/<key>.json (one pretty-printed file per key)
//! - Memory store: process-local map, nothing survives a restart

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key of the settings blob
pub const SETTINGS_KEY: &str = "zenfocus-settings";

/// Key of the session log blob (an ordered JSON array)
pub const SESSIONS_KEY: &str = "zenfocus-sessions";

/// Storage errors. Never fatal: callers fall back to defaults or to the
/// last state they hold in memory.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Corrupt value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// A durable key-value store of JSON values
pub trait KeyValueStore: Send + Sync {
    /// Load the value under `key`; `None` when it was never saved
    fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    /// Replace the value under `key`
    fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;
}

/// Store handle shared between the settings store and the session log
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Store backed by one JSON file per key
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn new(dir: &Path) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let path = self.key_path(key)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", key));

        let content = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh memory store in a shared handle
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let values = self.values.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let mut values = self.values.lock().map_err(|_| PersistenceError::Poisoned)?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert!(store.load(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(&dir.path().join("nested")).unwrap();

        store.save(SESSIONS_KEY, &json!([{"id": 1}])).unwrap();
        let loaded = store.load(SESSIONS_KEY).unwrap().unwrap();
        assert_eq!(loaded, json!([{"id": 1}]));

        // No temp file left behind
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_file_store_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("zenfocus-settings.json"), "  \n").unwrap();
        assert!(store.load(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_store_garbage_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("zenfocus-settings.json"), "{not json").unwrap();
        assert!(matches!(
            store.load(SETTINGS_KEY),
            Err(PersistenceError::Json(_))
        ));
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.save("../escape", &json!(1)),
            Err(PersistenceError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.save("k", &json!(1)).unwrap();
        store.save("k", &json!(2)).unwrap();
        assert_eq!(store.load("k").unwrap(), Some(json!(2)));
        assert_eq!(store.load("other").unwrap(), None);
    }
}
