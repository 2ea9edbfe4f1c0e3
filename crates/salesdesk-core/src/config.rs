//! Client configuration model.

use crate::backend::ChatContext;
use crate::error::{Result, SalesdeskError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COMPANY: &str = "Google";

/// Companies offered by default in the company picker.
pub const DEFAULT_COMPANIES: &[&str] = &["Google", "Microsoft", "Apple", "Tesla", "Amazon"];

/// Retry settings for background history refreshes.
///
/// The default is a single attempt: a failed refresh is logged and the
/// current view is kept.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based). Grows linearly.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the assistant backend.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Optional `limit` query parameter for history reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<u32>,
    pub default_company: String,
    pub companies: Vec<String>,
    pub sync_retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_limit: None,
            default_company: DEFAULT_COMPANY.to_string(),
            companies: DEFAULT_COMPANIES.iter().map(|c| c.to_string()).collect(),
            sync_retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Chat context used before the user picks a company.
    pub fn initial_context(&self) -> ChatContext {
        ChatContext::new(self.default_company.clone())
    }

    /// Whether `company` is one of the selectable companies (case-sensitive).
    pub fn is_known_company(&self, company: &str) -> bool {
        self.companies.iter().any(|c| c == company)
    }

    /// Checks the invariants the rest of the client relies on.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(SalesdeskError::config("base_url must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(SalesdeskError::config(
                "request_timeout_secs must be greater than zero",
            ));
        }
        if self.sync_retry.max_attempts == 0 {
            return Err(SalesdeskError::config(
                "sync_retry.max_attempts must be at least 1",
            ));
        }
        if !self.is_known_company(&self.default_company) {
            return Err(SalesdeskError::config(format!(
                "default_company '{}' is not listed in companies",
                self.default_company
            )));
        }
        Ok(())
    }
}
