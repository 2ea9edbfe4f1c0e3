use super::store::ConversationStore;
use super::synchronizer::HistorySynchronizer;
use salesdesk_core::backend::{ChatBackend, ChatContext, ChatReply, ChatRequest};
use salesdesk_core::conversation::Message;
use salesdesk_core::error::{DispatchError, SendRejected};
use salesdesk_core::session::SessionId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// How the backend answered a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnReply {
    Answered(ChatReply),
    /// The error notice shown to the user embeds this error's description.
    Failed(DispatchError),
}

/// Result of a completed [`MessageDispatcher::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: TurnReply,
    /// Whether the post-turn history refresh replaced the conversation.
    pub resynchronized: bool,
}

impl TurnOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self.reply, TurnReply::Answered(_))
    }
}

/// Runs one user turn at a time.
///
/// The user message is appended before the request is issued and is never
/// removed afterwards. A failed request is reported in the conversation as
/// an assistant error notice rather than returned as an error.
pub struct MessageDispatcher {
    backend: Arc<dyn ChatBackend>,
    store: Arc<ConversationStore>,
    synchronizer: Arc<HistorySynchronizer>,
    in_flight: AtomicBool,
}

impl MessageDispatcher {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<ConversationStore>,
        synchronizer: Arc<HistorySynchronizer>,
    ) -> Self {
        Self {
            backend,
            store,
            synchronizer,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a turn is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sends `text` as the next user message.
    ///
    /// # Errors
    ///
    /// Rejects blank text and concurrent sends. In both cases nothing is
    /// appended and no request is made.
    pub async fn send(
        &self,
        session_id: &SessionId,
        text: &str,
        context: &ChatContext,
    ) -> Result<TurnOutcome, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SendRejected::TurnInFlight)?;

        let user_message = Message::user(text);
        self.store.append(user_message.clone());
        info!(
            session_id = %session_id,
            company = %context.company,
            "[MessageDispatcher] Turn started"
        );

        let request = ChatRequest::new(text, context);
        let (reply, pending_tail) = match self.backend.send_chat(session_id, &request).await {
            Ok(reply) => {
                if let Some(pipeline) = &reply.debug_pipeline {
                    debug!(session_id = %session_id, pipeline = %pipeline, "[MessageDispatcher] Backend pipeline");
                }
                self.store.append(Message::assistant(reply.response.as_str()));
                info!(session_id = %session_id, "[MessageDispatcher] Turn answered");
                (TurnReply::Answered(reply), Vec::new())
            }
            Err(err) => {
                let err = DispatchError::from(err);
                warn!(session_id = %session_id, error = %err, "[MessageDispatcher] Turn failed");
                let notice = Message::error_notice(&err);
                self.store.append(notice.clone());
                (TurnReply::Failed(err), vec![user_message, notice])
            }
        };

        let resynchronized = self
            .synchronizer
            .refresh_with_tail(session_id, pending_tail)
            .await;

        Ok(TurnOutcome {
            reply,
            resynchronized,
        })
    }
}

/// Holds the single-flight flag; cleared on drop, including cancellation.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, entry};
    use salesdesk_core::config::RetryPolicy;
    use salesdesk_core::conversation::MessageRole;
    use salesdesk_core::error::BackendError;

    struct Harness {
        backend: Arc<ScriptedBackend>,
        store: Arc<ConversationStore>,
        dispatcher: Arc<MessageDispatcher>,
    }

    fn harness(backend: ScriptedBackend) -> Harness {
        let backend = Arc::new(backend);
        let store = Arc::new(ConversationStore::new());
        let synchronizer = Arc::new(HistorySynchronizer::new(
            backend.clone(),
            store.clone(),
            RetryPolicy::default(),
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            backend.clone(),
            store.clone(),
            synchronizer,
        ));
        Harness {
            backend,
            store,
            dispatcher,
        }
    }

    fn session() -> SessionId {
        SessionId::parse("session-1").unwrap()
    }

    fn google() -> ChatContext {
        ChatContext::new("Google")
    }

    #[tokio::test]
    async fn test_successful_turn_is_reconciled_with_history() {
        let h = harness(ScriptedBackend::new());
        h.backend.push_chat(Ok(ChatReply::new("Revenue was $2M.")));
        h.backend
            .set_default_history(vec![entry("Revenue?", "Revenue was $2M.")]);

        let outcome = h
            .dispatcher
            .send(&session(), "Revenue?", &google())
            .await
            .unwrap();

        assert!(outcome.is_answered());
        assert!(outcome.resynchronized);
        assert_eq!(
            h.store.snapshot().messages(),
            &[Message::user("Revenue?"), Message::assistant("Revenue was $2M.")]
        );
        assert_eq!(h.backend.requests()[0].company, "Google");
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_user_message_and_one_notice() {
        let h = harness(ScriptedBackend::new());
        h.backend
            .push_chat(Err(BackendError::status(500, "database offline")));

        let outcome = h
            .dispatcher
            .send(&session(), "Top items?", &google())
            .await
            .unwrap();

        assert!(matches!(outcome.reply, TurnReply::Failed(_)));
        let snapshot = h.store.snapshot();
        assert_eq!(
            snapshot.messages(),
            &[
                Message::user("Top items?"),
                Message::assistant(
                    "**Error**: Server Error (500): database offline. Please try again."
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_survives_failed_refresh() {
        let h = harness(ScriptedBackend::new());
        h.backend.push_chat(Err(BackendError::transport("timed out")));
        h.backend
            .push_history(Err(BackendError::transport("timed out")));

        let outcome = h
            .dispatcher
            .send(&session(), "hello", &google())
            .await
            .unwrap();

        assert!(!outcome.resynchronized);
        let roles: Vec<MessageRole> = h
            .store
            .snapshot()
            .messages()
            .iter()
            .map(Message::role)
            .collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[tokio::test]
    async fn test_timed_out_turn_recorded_by_backend_appears_once() {
        let h = harness(ScriptedBackend::new());
        h.backend
            .push_chat(Err(BackendError::transport("operation timed out")));
        h.backend
            .set_default_history(vec![entry("hello", "Revenue was $2M.")]);

        let outcome = h
            .dispatcher
            .send(&session(), "hello", &google())
            .await
            .unwrap();

        assert!(matches!(outcome.reply, TurnReply::Failed(_)));
        assert!(outcome.resynchronized);
        assert_eq!(
            h.store.snapshot().messages(),
            &[Message::user("hello"), Message::assistant("Revenue was $2M.")]
        );
    }

    #[tokio::test]
    async fn test_missing_response_field_notice() {
        let h = harness(ScriptedBackend::new());
        h.backend.push_chat(Err(BackendError::MissingField("response")));

        h.dispatcher
            .send(&session(), "hello", &google())
            .await
            .unwrap();

        let snapshot = h.store.snapshot();
        assert_eq!(
            snapshot.messages().last().map(Message::content),
            Some("**Error**: Invalid response format from server. Please try again.")
        );
    }

    #[tokio::test]
    async fn test_success_survives_failed_refresh() {
        let h = harness(ScriptedBackend::new());
        h.backend.push_chat(Ok(ChatReply::new("42")));
        h.backend.push_history(Err(BackendError::status(503, "")));

        let outcome = h
            .dispatcher
            .send(&session(), "answer?", &google())
            .await
            .unwrap();

        assert!(outcome.is_answered());
        assert!(!outcome.resynchronized);
        assert_eq!(
            h.store.snapshot().messages(),
            &[Message::user("answer?"), Message::assistant("42")]
        );
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let h = harness(ScriptedBackend::new());

        let err = h
            .dispatcher
            .send(&session(), "   \n", &google())
            .await
            .unwrap_err();

        assert_eq!(err, SendRejected::EmptyMessage);
        assert!(h.store.is_empty());
        assert_eq!(h.backend.chat_calls(), 0);
        assert_eq!(h.backend.history_calls(), 0);
    }

    #[tokio::test]
    async fn test_text_is_sent_untrimmed() {
        let h = harness(ScriptedBackend::new());
        h.backend.push_history(Err(BackendError::transport("offline")));

        h.dispatcher
            .send(&session(), "  spaced  ", &google())
            .await
            .unwrap();

        assert_eq!(h.backend.requests()[0].message, "  spaced  ");
        assert_eq!(h.store.snapshot().messages()[0], Message::user("  spaced  "));
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_rejected() {
        let h = harness(ScriptedBackend::gated());

        let first = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .send(&session(), "first", &google())
                    .await
            })
        };
        while h.backend.chat_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(h.dispatcher.is_in_flight());

        let second = h.dispatcher.send(&session(), "second", &google()).await;
        assert_eq!(second.unwrap_err(), SendRejected::TurnInFlight);
        assert_eq!(h.backend.chat_calls(), 1);
        assert_eq!(h.store.len(), 1);

        h.backend.release_chat();
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.is_answered());
        assert!(!h.dispatcher.is_in_flight());
    }

    #[tokio::test]
    async fn test_guard_is_released_when_turn_is_cancelled() {
        let h = harness(ScriptedBackend::gated());

        let first = {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .send(&session(), "first", &google())
                    .await
            })
        };
        while h.backend.chat_calls() == 0 {
            tokio::task::yield_now().await;
        }

        first.abort();
        let _ = first.await;

        assert!(!h.dispatcher.is_in_flight());
    }
}
