//! HttpChatBackend - REST client for the sales-data assistant.
//!
//! - `GET  {base_url}/history/{session_id}[?limit=N]` returns `{ "history": [...] }`
//! - `POST {base_url}/chat/{session_id}` with `{ "message", "company" }`
//!   returns `{ "response": "...", "debug_pipeline": ... }`

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use salesdesk_core::backend::{ChatBackend, ChatReply, ChatRequest};
use salesdesk_core::config::ClientConfig;
use salesdesk_core::conversation::HistoryEntry;
use salesdesk_core::error::{BackendError, SalesdeskError};
use salesdesk_core::session::SessionId;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    debug_pipeline: Option<serde_json::Value>,
}

/// [`ChatBackend`] talking JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChatBackend {
    client: Client,
    base_url: Url,
    history_limit: Option<u32>,
}

impl HttpChatBackend {
    /// Creates a backend rooted at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SalesdeskError> {
        let base_url = Url::parse(base_url).map_err(|err| {
            SalesdeskError::config(format!("Invalid base_url '{base_url}': {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SalesdeskError::config(format!(
                "base_url '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SalesdeskError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            history_limit: None,
        })
    }

    /// Builds a backend from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SalesdeskError> {
        let mut backend = Self::new(&config.base_url, config.request_timeout())?;
        backend.history_limit = config.history_limit;
        Ok(backend)
    }

    /// Sends `limit` with every history request.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = Some(limit);
        self
    }

    fn endpoint(&self, resource: &str, session_id: &SessionId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            // Checked in `new`: the base URL always has path segments.
            segments.pop_if_empty().push(resource).push(session_id.as_str());
        }
        url
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn fetch_history(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        let mut url = self.endpoint("history", session_id);
        if let Some(limit) = self.history_limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        debug!(session_id = %session_id, url = %url, "Fetching history");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body: HistoryResponse = read_json(response).await?;
        let history = body.history.unwrap_or_default();
        debug!(session_id = %session_id, entries = history.len(), "History fetched");
        Ok(history)
    }

    async fn send_chat(
        &self,
        session_id: &SessionId,
        request: &ChatRequest,
    ) -> Result<ChatReply, BackendError> {
        let url = self.endpoint("chat", session_id);
        debug!(
            session_id = %session_id,
            company = %request.company,
            "Sending chat message"
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body: ChatResponseBody = read_json(response).await?;
        let reply = body
            .response
            .filter(|text| !text.is_empty())
            .ok_or(BackendError::MissingField("response"))?;

        Ok(ChatReply {
            response: reply,
            debug_pipeline: body.debug_pipeline,
        })
    }
}

/// Checks the status and decodes the body of `response`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_http_error(status, body));
    }

    let text = response.text().await.map_err(map_transport_error)?;
    serde_json::from_str(&text).map_err(|err| BackendError::Malformed(err.to_string()))
}

/// The description is the body text, or the status reason when it is empty.
fn map_http_error(status: StatusCode, body: String) -> BackendError {
    let description = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        body
    };
    debug!(status = status.as_u16(), "Backend returned an error status");
    BackendError::status(status.as_u16(), description)
}

fn map_transport_error(err: reqwest::Error) -> BackendError {
    BackendError::transport(err.to_string())
}
