//! Scripted [`ChatBackend`] used by the unit tests of this crate.

use async_trait::async_trait;
use salesdesk_core::backend::{ChatBackend, ChatReply, ChatRequest};
use salesdesk_core::conversation::HistoryEntry;
use salesdesk_core::error::BackendError;
use salesdesk_core::session::SessionId;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

type HistoryResult = Result<Vec<HistoryEntry>, BackendError>;
type ChatResult = Result<ChatReply, BackendError>;

/// Replays queued results. When a queue runs dry the history falls back to
/// `default_history` and chat to a fixed reply.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    history: Mutex<VecDeque<HistoryResult>>,
    default_history: Mutex<Vec<HistoryEntry>>,
    chat: Mutex<VecDeque<ChatResult>>,
    requests: Mutex<Vec<ChatRequest>>,
    history_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    chat_gate: Option<Semaphore>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Chat calls wait until [`release_chat`](Self::release_chat) is called.
    pub(crate) fn gated() -> Self {
        Self {
            chat_gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub(crate) fn release_chat(&self) {
        if let Some(gate) = &self.chat_gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn with_default_history(self, entries: Vec<HistoryEntry>) -> Self {
        *self.default_history.lock().unwrap() = entries;
        self
    }

    pub(crate) fn push_history(&self, result: HistoryResult) {
        self.history.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_chat(&self, result: ChatResult) {
        self.chat.lock().unwrap().push_back(result);
    }

    pub(crate) fn set_default_history(&self, entries: Vec<HistoryEntry>) {
        *self.default_history.lock().unwrap() = entries;
    }

    pub(crate) fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn fetch_history(&self, _session_id: &SessionId) -> HistoryResult {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.history.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_history.lock().unwrap().clone()))
    }

    async fn send_chat(&self, _session_id: &SessionId, request: &ChatRequest) -> ChatResult {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.chat_gate {
            gate.acquire().await.unwrap().forget();
        }
        let scripted = self.chat.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(ChatReply::new("ok")))
    }
}

pub(crate) fn entry(question: &str, answer: &str) -> HistoryEntry {
    HistoryEntry::new(Some(question), Some(answer))
}
