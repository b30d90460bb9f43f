//! Key/value persistence for per-user state
//!
//! Values are JSON strings stored under flat keys such as `favorites_alice`.
//! [`FileStore`] keeps one file per key under the data directory.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;

/// String key/value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// File-backed store, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys embed usernames, which may contain path separators
        self.root.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        fs::write(&path, value)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Read a JSON value, treating a missing entry as the default.
///
/// A value that does not parse is reported as [`StoreError::Corrupt`] so
/// read-modify-write callers never overwrite it.
pub fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };

    serde_json::from_str(&raw).map_err(|e| {
        warn!("Stored entry {} is unreadable: {}", key, e);
        StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Decode list items one by one, dropping those that do not fit `T`
pub fn decode_each<T: DeserializeOwned>(items: Vec<serde_json::Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping unreadable stored entry: {}", e);
                None
            }
        })
        .collect()
}

/// `deserialize_with` helper for lists whose items are decoded by [`decode_each`]
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Vec::<serde_json::Value>::deserialize(deserializer).map(decode_each)
}

pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_dir;

    #[test]
    fn test_file_store_round_trip_and_remove() {
        let store = FileStore::new(temp_dir("filestore"));
        assert_eq!(store.get("history_alice").unwrap(), None);

        store.set("history_alice", "[]").unwrap();
        assert_eq!(store.get("history_alice").unwrap().as_deref(), Some("[]"));

        store.remove("history_alice").unwrap();
        assert_eq!(store.get("history_alice").unwrap(), None);
        // Removing again is fine
        store.remove("history_alice").unwrap();
    }

    #[test]
    fn test_file_store_keys_with_separators_stay_inside_root() {
        let root = temp_dir("filestore-sep");
        let store = FileStore::new(root.clone());
        store.set("favorites_../evil", "{}").unwrap();
        assert!(store.path_for("favorites_../evil").starts_with(&root));
        assert_eq!(store.get("favorites_../evil").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_read_json_missing_is_default() {
        let store = MemoryStore::new();
        let empty: Vec<String> = read_json(&store, "k").unwrap();
        assert!(empty.is_empty());

        write_json(&store, "k", &vec!["a".to_string()]).unwrap();
        let value: Vec<String> = read_json(&store, "k").unwrap();
        assert_eq!(value, vec!["a".to_string()]);
    }

    #[test]
    fn test_read_json_reports_unparseable_value() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();

        let err = read_json::<Vec<String>>(&store, "k").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "k"));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_decode_each_skips_bad_items() {
        let items = vec![
            serde_json::json!("a"),
            serde_json::json!(3),
            serde_json::json!("b"),
        ];
        let decoded: Vec<String> = decode_each(items);
        assert_eq!(decoded, vec!["a".to_string(), "b".to_string()]);
    }
}
