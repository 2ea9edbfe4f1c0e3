//! ChatSession - one visitor's conversation with the sales assistant.
//!
//! Wires the session identity, conversation store, history synchronizer
//! and message dispatcher together, and tracks the selected company.

use crate::conversation::{
    ConversationSnapshot, ConversationStore, HistorySynchronizer, MessageDispatcher, TurnOutcome,
};
use salesdesk_core::backend::{ChatBackend, ChatContext};
use salesdesk_core::config::ClientConfig;
use salesdesk_core::conversation::Message;
use salesdesk_core::error::{Result, SalesdeskError, SendRejected};
use salesdesk_core::render::{ContentRenderer, DisplayNode};
use salesdesk_core::session::{SessionId, SessionIdentityManager};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::info;

pub struct ChatSession {
    session_id: SessionId,
    config: ClientConfig,
    context: RwLock<ChatContext>,
    store: Arc<ConversationStore>,
    synchronizer: Arc<HistorySynchronizer>,
    dispatcher: MessageDispatcher,
    renderer: ContentRenderer,
}

impl ChatSession {
    /// Resolves the session identity and loads the existing conversation.
    ///
    /// # Errors
    ///
    /// Fails only if the session identifier cannot be read or persisted. A
    /// failed history load leaves the conversation empty.
    pub async fn bootstrap(
        identity: &SessionIdentityManager,
        backend: Arc<dyn ChatBackend>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let session_id = identity.get_or_create_session_id()?;

        let store = Arc::new(ConversationStore::new());
        let synchronizer = Arc::new(HistorySynchronizer::new(
            backend.clone(),
            store.clone(),
            config.sync_retry.clone(),
        ));
        let dispatcher = MessageDispatcher::new(backend, store.clone(), synchronizer.clone());

        let session = Self {
            session_id,
            config: config.clone(),
            context: RwLock::new(config.initial_context()),
            store,
            synchronizer,
            dispatcher,
            renderer: ContentRenderer::new(),
        };

        let loaded = session.refresh().await;
        info!(
            session_id = %session.session_id,
            loaded,
            messages = session.store.len(),
            "[ChatSession] Session ready"
        );
        Ok(session)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.store.snapshot()
    }

    /// Receiver notified whenever the conversation changes.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.store.subscribe()
    }

    /// Whether a message is being sent; the UI should not offer sending.
    pub fn is_in_flight(&self) -> bool {
        self.dispatcher.is_in_flight()
    }

    pub fn companies(&self) -> &[String] {
        &self.config.companies
    }

    /// Company the next message will be asked about.
    pub fn company(&self) -> String {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .company
            .clone()
    }

    /// Switches the company for subsequent messages.
    ///
    /// # Errors
    ///
    /// Returns [`SalesdeskError::InvalidInput`] for a company that is not
    /// one of [`companies`](Self::companies).
    pub fn select_company(&self, company: &str) -> Result<()> {
        if !self.config.is_known_company(company) {
            return Err(SalesdeskError::invalid_input(format!(
                "Unknown company '{company}'"
            )));
        }
        let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
        if context.company != company {
            info!(from = %context.company, to = %company, "[ChatSession] Company changed");
            *context = ChatContext::new(company);
        }
        Ok(())
    }

    /// Sends `text` about the selected company.
    pub async fn send(&self, text: &str) -> std::result::Result<TurnOutcome, SendRejected> {
        let context = self
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.dispatcher.send(&self.session_id, text, &context).await
    }

    /// Reloads the conversation from the backend, keeping it on failure.
    pub async fn refresh(&self) -> bool {
        self.synchronizer.refresh(&self.session_id).await
    }

    pub fn render(&self, message: &Message) -> DisplayNode {
        self.renderer.render(message)
    }

    /// The current conversation, rendered for display.
    pub fn rendered_messages(&self) -> Vec<(Message, DisplayNode)> {
        self.snapshot()
            .messages()
            .iter()
            .map(|message| (message.clone(), self.render(message)))
            .collect()
    }
}
