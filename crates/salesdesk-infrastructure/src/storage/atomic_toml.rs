//! Atomic TOML file operations.
//!
//! Writes go to a temporary sibling file which is synced and then renamed
//! over the target, so readers see either the old or the new document.
//! Read-modify-write cycles hold an exclusive `fs2` lock on a sibling
//! `.lock` file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during atomic TOML operations.
#[derive(Error, Debug)]
pub enum AtomicTomlError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },
}

/// A handle to a TOML document stored in a single file.
#[derive(Debug, Clone)]
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// Returns `Ok(None)` when the file does not exist or is blank.
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| AtomicTomlError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Serializes `data` and replaces the file atomically.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        self.ensure_parent()?;
        let rendered = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path();
        let write = || -> io::Result<()> {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(rendered.as_bytes())?;
            tmp_file.sync_all()?;
            drop(tmp_file);
            fs::rename(&tmp_path, &self.path)
        };

        write().map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            self.io_error(err)
        })
    }

    /// Loads the current document (or `default_value`), lets `f` modify it
    /// and writes it back, all under an exclusive lock.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<(), AtomicTomlError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data);
        self.save(&data)
    }

    fn ensure_parent(&self) -> Result<(), AtomicTomlError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))
            }
            _ => Ok(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn io_error(&self, source: io::Error) -> AtomicTomlError {
        AtomicTomlError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Exclusive lock released when dropped.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");
        let lock_error = |message: String| AtomicTomlError::Lock {
            path: lock_path.clone(),
            message,
        };

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| lock_error(err.to_string()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|err| lock_error(err.to_string()))?;

        use fs2::FileExt;
        file.lock_exclusive()
            .map_err(|err| lock_error(err.to_string()))?;

        Ok(FileLock { _file: file })
    }
}
