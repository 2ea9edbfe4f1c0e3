//! Location of the client's files on disk.
//!
//! ```text
//! ~/.config/salesdesk/          # Config directory
//! ├── config.toml               # ClientConfig
//! ├── local_storage.toml        # Persisted key/value pairs (session id)
//! └── logs/                     # Daily rolling log files
//!     └── salesdesk.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR_NAME: &str = "salesdesk";

/// Errors that can occur during path resolution.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no per-user config directory.
    #[error("Cannot find the user configuration directory")]
    ConfigDirNotFound,
}

/// Resolves client file paths, optionally under an explicit base directory.
#[derive(Debug, Clone, Default)]
pub struct SalesdeskPaths {
    base: Option<PathBuf>,
}

impl SalesdeskPaths {
    /// `None` uses the platform config directory (XDG on Linux).
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the salesdesk configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// File holding the persisted local storage items.
    pub fn local_storage_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("local_storage.toml"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_override() {
        let paths = SalesdeskPaths::new(Some(PathBuf::from("/tmp/sd")));
        assert_eq!(paths.config_dir().unwrap(), PathBuf::from("/tmp/sd"));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/sd/config.toml")
        );
        assert_eq!(
            paths.local_storage_file().unwrap(),
            PathBuf::from("/tmp/sd/local_storage.toml")
        );
        assert_eq!(paths.logs_dir().unwrap(), PathBuf::from("/tmp/sd/logs"));
    }

    #[test]
    fn test_default_dir_is_named_after_app() {
        // Some CI containers have no home directory.
        if let Ok(dir) = SalesdeskPaths::default().config_dir() {
            assert!(dir.ends_with("salesdesk"));
        }
    }
}
