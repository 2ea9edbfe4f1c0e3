//! Local storage persisted as a TOML file.

use crate::storage::AtomicTomlFile;
use salesdesk_core::error::IdentityError;
use salesdesk_core::session::LocalStorage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalStorageDocument {
    #[serde(default)]
    items: BTreeMap<String, String>,
}

/// [`LocalStorage`] backed by `local_storage.toml`.
///
/// Every handle on the same path shares one storage scope. Values survive
/// process restarts and are never expired.
#[derive(Debug, Clone)]
pub struct TomlLocalStorage {
    file: AtomicTomlFile<LocalStorageDocument>,
}

impl TomlLocalStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }
}

impl LocalStorage for TomlLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let document = self.file.load().map_err(|err| IdentityError::Read {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        Ok(document.and_then(|mut doc| doc.items.remove(key)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        self.file
            .update(LocalStorageDocument::default(), |doc| {
                doc.items.insert(key.to_string(), value.to_string());
            })
            .map_err(|err| IdentityError::Write {
                key: key.to_string(),
                message: err.to_string(),
            })?;
        tracing::debug!(key, path = %self.file.path().display(), "Persisted local storage item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdesk_core::session::{SESSION_ID_KEY, SessionIdentityManager};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing_item() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TomlLocalStorage::new(temp_dir.path().join("local_storage.toml"));
        assert_eq!(storage.get_item("anything").unwrap(), None);
    }

    #[test]
    fn test_set_then_get_keeps_other_items() {
        let temp_dir = TempDir::new().unwrap();
        let storage = TomlLocalStorage::new(temp_dir.path().join("local_storage.toml"));

        storage.set_item("theme", "dark").unwrap();
        storage.set_item(SESSION_ID_KEY, "abc").unwrap();

        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(
            storage.get_item(SESSION_ID_KEY).unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_identity_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local_storage.toml");

        let first = SessionIdentityManager::new(Arc::new(TomlLocalStorage::new(path.clone())))
            .get_or_create_session_id()
            .unwrap();
        let second = SessionIdentityManager::new(Arc::new(TomlLocalStorage::new(path.clone())))
            .get_or_create_session_id()
            .unwrap();

        assert_eq!(first, second);
        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains(first.as_str()));
    }

    #[test]
    fn test_corrupt_file_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local_storage.toml");
        fs::write(&path, "items = ").unwrap();

        let err = TomlLocalStorage::new(path)
            .get_item(SESSION_ID_KEY)
            .unwrap_err();
        assert!(matches!(err, IdentityError::Read { .. }));
    }
}
