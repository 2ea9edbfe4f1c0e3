//! Loading of `config.toml`.
//!
//! A missing file is created with defaults on first load. Environment
//! overrides are applied on top of the file and the result is validated
//! before it is cached.

use crate::paths::SalesdeskPaths;
use crate::storage::{AtomicTomlError, AtomicTomlFile};
use salesdesk_core::config::ClientConfig;
use salesdesk_core::error::{Result, SalesdeskError};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Overrides `base_url`.
pub const ENV_BASE_URL: &str = "SALESDESK_BASE_URL";
/// Overrides `default_company`.
pub const ENV_COMPANY: &str = "SALESDESK_COMPANY";

impl From<AtomicTomlError> for SalesdeskError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Parse { path, source } => SalesdeskError::Serialization {
                format: "TOML".to_string(),
                message: format!("{}: {}", path.display(), source),
            },
            AtomicTomlError::Serialize(source) => source.into(),
            other => SalesdeskError::io(other.to_string()),
        }
    }
}

/// Loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    file: AtomicTomlFile<ClientConfig>,
    cached: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    /// Uses `config.toml` in the resolved configuration directory.
    pub fn new(paths: &SalesdeskPaths) -> Result<Self> {
        let path = paths
            .config_file()
            .map_err(|e| SalesdeskError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, reading the file on first access.
    pub fn load(&self) -> Result<ClientConfig> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load) with a custom environment lookup.
    pub fn load_with<F>(&self, env: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cached) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let mut config = match self.file.load()? {
            Some(config) => {
                debug!(path = %self.file.path().display(), "Loaded configuration");
                config
            }
            None => {
                let config = ClientConfig::default();
                self.file.save(&config)?;
                info!(path = %self.file.path().display(), "Created default configuration");
                config
            }
        };

        apply_env_overrides(&mut config, env);
        config.validate()?;

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(config)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Applies `SALESDESK_*` overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    if let Some(base_url) = lookup(ENV_BASE_URL) {
        debug!(base_url = %base_url, "Base URL overridden from environment");
        config.base_url = base_url;
    }
    if let Some(company) = lookup(ENV_COMPANY) {
        debug!(company = %company, "Default company overridden from environment");
        config.default_company = company;
    }
}
