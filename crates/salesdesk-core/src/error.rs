//! Error types for the SalesDesk client core.
//!
//! Remote failures share one vocabulary ([`BackendError`]) and are then
//! wrapped by the component that observed them: [`SyncError`] for history
//! refreshes (swallowed at the synchronizer boundary) and [`DispatchError`]
//! for chat turns (turned into a visible assistant message).

use thiserror::Error;

/// A failure reported while talking to the remote assistant backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (connect, timeout, DNS...).
    #[error("Request failed: {message}")]
    Transport { message: String },

    /// The backend answered with a non-success status.
    ///
    /// `body` holds the response text, or the reason phrase when the body
    /// was empty.
    #[error("Server Error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded as the expected JSON document.
    #[error("Malformed response from server: {0}")]
    Malformed(String),

    /// The body decoded but lacked a required field.
    #[error("Invalid response format from server")]
    MissingField(&'static str),
}

impl BackendError {
    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a Status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, rate limiting and server-side errors are
    /// considered transient; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Malformed(_) | Self::MissingField(_) => false,
        }
    }
}

/// The persisted session identity could not be read or written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to read '{key}' from local storage: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}' to local storage: {message}")]
    Write { key: String, message: String },
}

/// Fetching or decoding the remote history failed.
///
/// The caller keeps showing whatever it displayed before.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("History sync failed for session {session_id}: {source}")]
pub struct SyncError {
    pub session_id: String,
    #[source]
    pub source: BackendError,
}

impl SyncError {
    pub fn new(session_id: impl Into<String>, source: BackendError) -> Self {
        Self {
            session_id: session_id.into(),
            source,
        }
    }
}

/// A chat turn failed after the user message was already shown.
///
/// Its `Display` output is the description embedded in the synthesized
/// assistant error notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(transparent)]
pub struct DispatchError(#[from] BackendError);

impl DispatchError {
    /// The underlying backend failure.
    pub fn backend(&self) -> &BackendError {
        &self.0
    }
}

/// Reasons a `send` is refused before anything is appended or requested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A message is already being sent")]
    TurnInFlight,
}

/// Shared error type for configuration, storage and bootstrap code.
///
/// History and turn failures never reach it: they are absorbed by the
/// synchronizer and dispatcher.
#[derive(Error, Debug, Clone)]
pub enum SalesdeskError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied a value outside the accepted set
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },
}

impl SalesdeskError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an identity error
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }
}

impl From<std::io::Error> for SalesdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SalesdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SalesdeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SalesdeskError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SalesdeskError>`.
pub type Result<T> = std::result::Result<T, SalesdeskError>;
