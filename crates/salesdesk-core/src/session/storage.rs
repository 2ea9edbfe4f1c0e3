//! Local key-value storage seam.

use crate::error::IdentityError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Persistent string key-value storage scoped to one local profile.
///
/// Mirrors the browser `localStorage` surface: synchronous, string keys and
/// values, no expiry.
pub trait LocalStorage: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, IdentityError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), IdentityError>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, IdentityError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        (**self).set_item(key, value)
    }
}

/// In-process storage. Lives as long as the value itself.
#[derive(Debug, Default)]
pub struct MemoryLocalStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let items = self
            .items
            .lock()
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryLocalStorage::new();
        assert!(storage.get_item("k").unwrap().is_none());

        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();

        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);
    }
}
