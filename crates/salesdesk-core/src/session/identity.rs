//! Creation and persistence of the anonymous session identifier.

use super::model::SessionId;
use super::storage::LocalStorage;
use crate::error::IdentityError;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Local storage key holding the session identifier.
pub const SESSION_ID_KEY: &str = "chat_user_id";

/// Owns the session identifier for one storage scope.
///
/// The first call to [`get_or_create_session_id`](Self::get_or_create_session_id)
/// either reads the persisted identifier or generates and persists a new
/// one. Every later call returns the same value without touching storage.
pub struct SessionIdentityManager {
    storage: Arc<dyn LocalStorage>,
    resolved: OnceLock<SessionId>,
}

impl SessionIdentityManager {
    /// Creates a manager over the given storage scope.
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            resolved: OnceLock::new(),
        }
    }

    /// Returns the persisted session identifier, creating it on first use.
    ///
    /// An existing non-blank value is never overwritten. A blank value is
    /// treated as absent and replaced.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the storage cannot be read or the new
    /// identifier cannot be persisted. Without an identifier no conversation
    /// is possible, so callers should treat this as fatal.
    pub fn get_or_create_session_id(&self) -> Result<SessionId, IdentityError> {
        if let Some(id) = self.resolved.get() {
            return Ok(id.clone());
        }

        let stored = self.storage.get_item(SESSION_ID_KEY)?;
        let id = match stored.clone().and_then(SessionId::parse) {
            Some(existing) => {
                debug!(session_id = %existing, "Restored session identifier");
                existing
            }
            None => {
                if stored.is_some() {
                    warn!("Stored session identifier is blank; generating a new one");
                }
                let fresh = SessionId::generate();
                self.storage.set_item(SESSION_ID_KEY, fresh.as_str())?;
                info!(session_id = %fresh, "Created new session identifier");
                fresh
            }
        };

        Ok(self.resolved.get_or_init(|| id).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryLocalStorage;

    struct BrokenStorage;

    impl LocalStorage for BrokenStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, IdentityError> {
            Err(IdentityError::Read {
                key: key.to_string(),
                message: "disk on fire".to_string(),
            })
        }

        fn set_item(&self, key: &str, _value: &str) -> Result<(), IdentityError> {
            Err(IdentityError::Write {
                key: key.to_string(),
                message: "disk on fire".to_string(),
            })
        }
    }

    #[test]
    fn test_first_call_creates_and_persists() {
        let storage = Arc::new(MemoryLocalStorage::new());
        let manager = SessionIdentityManager::new(storage.clone());

        let id = manager.get_or_create_session_id().unwrap();

        assert_eq!(
            storage.get_item(SESSION_ID_KEY).unwrap().as_deref(),
            Some(id.as_str())
        );
    }

    #[test]
    fn test_repeated_calls_return_same_id() {
        let manager = SessionIdentityManager::new(Arc::new(MemoryLocalStorage::new()));

        let first = manager.get_or_create_session_id().unwrap();
        for _ in 0..5 {
            assert_eq!(manager.get_or_create_session_id().unwrap(), first);
        }
    }

    #[test]
    fn test_new_manager_on_same_scope_reuses_id() {
        let storage = Arc::new(MemoryLocalStorage::new());
        let first = SessionIdentityManager::new(storage.clone())
            .get_or_create_session_id()
            .unwrap();
        let second = SessionIdentityManager::new(storage)
            .get_or_create_session_id()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_value_is_not_overwritten() {
        let storage = Arc::new(MemoryLocalStorage::new());
        storage.set_item(SESSION_ID_KEY, "existing-user").unwrap();

        let manager = SessionIdentityManager::new(storage.clone());
        let id = manager.get_or_create_session_id().unwrap();

        assert_eq!(id.as_str(), "existing-user");
        assert_eq!(
            storage.get_item(SESSION_ID_KEY).unwrap().as_deref(),
            Some("existing-user")
        );
    }

    #[test]
    fn test_blank_value_is_replaced() {
        let storage = Arc::new(MemoryLocalStorage::new());
        storage.set_item(SESSION_ID_KEY, "  ").unwrap();

        let id = SessionIdentityManager::new(storage.clone())
            .get_or_create_session_id()
            .unwrap();

        assert_ne!(id.as_str().trim(), "");
        assert_eq!(
            storage.get_item(SESSION_ID_KEY).unwrap().as_deref(),
            Some(id.as_str())
        );
    }

    #[test]
    fn test_storage_failure_propagates() {
        let manager = SessionIdentityManager::new(Arc::new(BrokenStorage));
        let err = manager.get_or_create_session_id().unwrap_err();
        assert!(matches!(err, IdentityError::Read { .. }));
    }
}
