//! Contract of the remote assistant backend.
//!
//! The backend answers chat turns and serves the authoritative history of
//! a session. This crate only describes the contract; the HTTP
//! implementation lives in `salesdesk-interaction`.

use crate::conversation::HistoryEntry;
use crate::error::BackendError;
use crate::session::SessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration forwarded verbatim with every chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Company whose sales data the assistant should answer about.
    pub company: String,
}

impl ChatContext {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
        }
    }
}

/// Body of `POST /chat/{sessionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub company: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, context: &ChatContext) -> Self {
        Self {
            message: message.into(),
            company: context.company.clone(),
        }
    }
}

/// Successful chat reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    /// Query pipeline the backend ran, when it reports one.
    pub debug_pipeline: Option<serde_json::Value>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            debug_pipeline: None,
        }
    }
}

/// Remote assistant operations used by the conversation engine.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Reads the recorded turns of a session, oldest first.
    async fn fetch_history(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<HistoryEntry>, BackendError>;

    /// Sends one user message and waits for the assistant's reply.
    async fn send_chat(
        &self,
        session_id: &SessionId,
        request: &ChatRequest,
    ) -> Result<ChatReply, BackendError>;
}
