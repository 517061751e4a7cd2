//! JSON-file storage area for the CLI.
//!
//! The whole store is one JSON object on disk. Every write reads, updates and
//! rewrites the file; there is no locking between concurrent processes.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sf_core::storage::{StorageArea, StorageError};

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store. A missing file is an empty store.
    async fn load(&self) -> Result<Map<String, Value>, String> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(format!("Failed to read '{}': {}", self.path.display(), e)),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text)
            .map_err(|e| format!("Store '{}' is not a JSON object: {}", self.path.display(), e))
    }

    async fn save(&self, entries: &Map<String, Value>) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| format!("Failed to encode store: {}", e))?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| format!("Failed to write '{}': {}", self.path.display(), e))
    }
}

impl StorageArea for FileStorage {
    type Error = String;

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError<Self::Error>> {
        let mut entries = self.load().await.map_err(StorageError::Host)?;
        entries.insert(key.to_string(), value);
        self.save(&entries).await.map_err(StorageError::Host)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError<Self::Error>> {
        let mut entries = self.load().await.map_err(StorageError::Host)?;
        Ok(entries.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::{get_storage, set_storage};

    fn temp_store(name: &str) -> FileStorage {
        let dir = std::env::temp_dir().join(format!("sf-cli-test-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        FileStorage::new(dir.join("store.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = temp_store("missing");
        let value: Option<Value> = get_storage(&store, "anything").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_round_trip_and_keys_are_independent() {
        let store = temp_store("round-trip");
        set_storage(&store, "enabled", &true).await.unwrap();
        set_storage(&store, "count", &3u32).await.unwrap();

        assert_eq!(get_storage::<_, bool>(&store, "enabled").await.unwrap(), Some(true));
        assert_eq!(get_storage::<_, u32>(&store, "count").await.unwrap(), Some(3));

        // A fresh handle sees what the first one wrote
        let reopened = FileStorage::new(store.path());
        assert_eq!(get_storage::<_, u32>(&reopened, "count").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_host_error() {
        let store = temp_store("corrupt");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "[1, 2, 3]").unwrap();

        let result = get_storage::<_, Value>(&store, "k").await;
        assert!(matches!(result, Err(sf_core::StorageError::Host(_))));
    }
}
