use super::store::{ConversationSnapshot, ConversationStore};
use salesdesk_core::backend::ChatBackend;
use salesdesk_core::config::RetryPolicy;
use salesdesk_core::conversation::{Message, MessageRole, rebuild_messages};
use salesdesk_core::error::SyncError;
use salesdesk_core::session::SessionId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rebuilds the conversation from the backend's authoritative history.
pub struct HistorySynchronizer {
    backend: Arc<dyn ChatBackend>,
    store: Arc<ConversationStore>,
    retry: RetryPolicy,
}

impl HistorySynchronizer {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<ConversationStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            store,
            retry,
        }
    }

    /// Fetches the history and flattens it into messages.
    ///
    /// Transient failures are retried according to the [`RetryPolicy`].
    /// The store is never touched.
    pub async fn fetch_and_rebuild(&self, session_id: &SessionId) -> Result<Vec<Message>, SyncError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.backend.fetch_history(session_id).await {
                Ok(entries) => {
                    debug!(
                        session_id = %session_id,
                        entries = entries.len(),
                        attempt,
                        "[HistorySynchronizer] History received"
                    );
                    return Ok(rebuild_messages(&entries));
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    debug!(
                        session_id = %session_id,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "[HistorySynchronizer] Retrying history fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(SyncError::new(session_id.as_str(), err)),
            }
        }
    }

    /// Replaces the store with the rebuilt history.
    pub async fn synchronize(&self, session_id: &SessionId) -> Result<ConversationSnapshot, SyncError> {
        self.synchronize_with_tail(session_id, Vec::new()).await
    }

    /// Like [`synchronize`](Self::synchronize), but swallows the error.
    ///
    /// On failure the current view is kept as is. Returns whether the store
    /// was replaced.
    pub async fn refresh(&self, session_id: &SessionId) -> bool {
        self.refresh_with_tail(session_id, Vec::new()).await
    }

    /// Refresh that keeps `tail` after the remote history.
    ///
    /// Used after a failed turn: the user message and its error notice must
    /// stay visible. `tail` starts with that user message; when the backend
    /// recorded the turn anyway (client timeout, error after saving), the
    /// history already ends with it and `tail` is dropped.
    pub(crate) async fn refresh_with_tail(&self, session_id: &SessionId, tail: Vec<Message>) -> bool {
        match self.synchronize_with_tail(session_id, tail).await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    session_id = %err.session_id,
                    error = %err.source,
                    "[HistorySynchronizer] History refresh failed; keeping current view"
                );
                false
            }
        }
    }

    async fn synchronize_with_tail(
        &self,
        session_id: &SessionId,
        tail: Vec<Message>,
    ) -> Result<ConversationSnapshot, SyncError> {
        let mut messages = self.fetch_and_rebuild(session_id).await?;
        if ends_with_turn(&messages, &tail) {
            debug!(session_id = %session_id, "[HistorySynchronizer] Failed turn was recorded remotely");
        } else {
            messages.extend(tail);
        }
        let snapshot = self.store.replace_all(messages);
        debug!(
            session_id = %session_id,
            messages = snapshot.len(),
            revision = snapshot.revision(),
            "[HistorySynchronizer] Conversation replaced"
        );
        Ok(snapshot)
    }
}

/// Whether the last user message of `history` is the one `tail` starts with.
fn ends_with_turn(history: &[Message], tail: &[Message]) -> bool {
    let Some(question) = tail.first() else {
        return false;
    };
    history
        .iter()
        .rev()
        .find(|message| message.role() == MessageRole::User)
        .is_some_and(|last| last == question)
}
