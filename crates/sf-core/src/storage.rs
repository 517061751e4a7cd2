//! Key/value storage adapter
//!
//! [`StorageArea`] is the host's asynchronous key/value store: extension
//! local storage in the browser, a JSON file in the CLI, or [`MemoryStorage`].
//! [`set_storage`] and [`get_storage`] add typed (serde) access on top.
//!
//! Every call is single-key and single-shot. Host failures are returned to
//! the caller unchanged inside [`StorageError::Host`]; nothing is retried.
//! Values that cannot cross the JSON boundary are [`StorageError::Codec`],
//! whether the typed layer or the store itself hit the problem.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Error type for typed storage access.
#[derive(Debug, thiserror::Error)]
pub enum StorageError<E> {
    #[error("Host storage error: {0}")]
    Host(E),
    #[error("Cannot convert value for key '{key}': {reason}")]
    Codec { key: String, reason: String },
}

impl<E> StorageError<E> {
    pub fn codec(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Codec {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// An asynchronous key/value store owned by the host.
///
/// Futures are not required to be `Send`: browser storage completes on the
/// single JS event loop.
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    type Error;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError<Self::Error>>;

    /// Read the value under `key`, `None` if it was never set.
    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError<Self::Error>>;
}

/// Store `value` under `key`.
pub async fn set_storage<S, V>(area: &S, key: &str, value: &V) -> Result<(), StorageError<S::Error>>
where
    S: StorageArea,
    V: Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| StorageError::<S::Error>::codec(key, e))?;
    log::debug!("storage set '{}'", key);
    area.set_item(key, value).await
}

/// Read the value under `key`.
///
/// A key that was never set is `Ok(None)`, not an error.
pub async fn get_storage<S, V>(area: &S, key: &str) -> Result<Option<V>, StorageError<S::Error>>
where
    S: StorageArea,
    V: DeserializeOwned,
{
    let Some(value) = area.get_item(key).await? else {
        log::debug!("storage get '{}': absent", key);
        return Ok(None);
    };
    log::debug!("storage get '{}'", key);
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StorageError::codec(key, e))
}

// =============================================================================
// In-memory Store
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MemoryStorageError {
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize, MemoryStorageError> {
        self.entries
            .read()
            .map(|e| e.len())
            .map_err(|_| MemoryStorageError::Poisoned)
    }

    pub fn is_empty(&self) -> Result<bool, MemoryStorageError> {
        Ok(self.len()? == 0)
    }
}

impl StorageArea for MemoryStorage {
    type Error = MemoryStorageError;

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError<Self::Error>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Host(MemoryStorageError::Poisoned))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError<Self::Error>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Host(MemoryStorageError::Poisoned))?;
        Ok(entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterRuleItem, RuleType};

    /// Store whose every call fails, to check error forwarding.
    struct BrokenStorage;

    impl StorageArea for BrokenStorage {
        type Error = String;

        async fn set_item(&self, _key: &str, _value: Value) -> Result<(), StorageError<Self::Error>> {
            Err(StorageError::Host("QUOTA_BYTES quota exceeded".to_string()))
        }

        async fn get_item(&self, _key: &str) -> Result<Option<Value>, StorageError<Self::Error>> {
            Err(StorageError::Host("storage unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryStorage::new();
        let rules = vec![
            FilterRuleItem::new(RuleType::DomainSuffix, "example.com"),
            FilterRuleItem::new(RuleType::Regex, r"^https://mail\.google\.com/"),
        ];

        set_storage(&store, "rules", &rules).await.unwrap();
        let loaded: Option<Vec<FilterRuleItem>> = get_storage(&store, "rules").await.unwrap();
        assert_eq!(loaded, Some(rules));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_last_value() {
        let store = MemoryStorage::new();
        set_storage(&store, "enabled", &true).await.unwrap();
        set_storage(&store, "enabled", &false).await.unwrap();
        assert_eq!(get_storage::<_, bool>(&store, "enabled").await.unwrap(), Some(false));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let store = MemoryStorage::new();
        let value: Option<String> = get_storage(&store, "never-set").await.unwrap();
        assert_eq!(value, None);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_host_error_forwarded() {
        match set_storage(&BrokenStorage, "k", &1).await {
            Err(StorageError::Host(e)) => assert_eq!(e, "QUOTA_BYTES quota exceeded"),
            other => panic!("expected host error, got {other:?}"),
        }
        match get_storage::<_, i32>(&BrokenStorage, "k").await {
            Err(StorageError::Host(e)) => assert_eq!(e, "storage unavailable"),
            other => panic!("expected host error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_type_mismatch_is_codec_error() {
        let store = MemoryStorage::new();
        set_storage(&store, "count", "not a number").await.unwrap();
        let result = get_storage::<_, u32>(&store, "count").await;
        assert!(matches!(result, Err(StorageError::Codec { ref key, .. }) if key == "count"));
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryStorage::new());
        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.entries.write().unwrap();
            panic!("poison the store lock");
        })
        .join();

        assert!(matches!(store.len(), Err(MemoryStorageError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(MemoryStorageError::Poisoned)));
        assert!(matches!(
            set_storage(&*store, "k", &1).await,
            Err(StorageError::Host(MemoryStorageError::Poisoned))
        ));
        assert!(matches!(
            get_storage::<_, i32>(&*store, "k").await,
            Err(StorageError::Host(MemoryStorageError::Poisoned))
        ));
    }
}
