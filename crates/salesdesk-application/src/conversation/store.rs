use salesdesk_core::conversation::Message;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable view of the conversation at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ConversationSnapshot {
    revision: u64,
    messages: Arc<Vec<Message>>,
}

impl ConversationSnapshot {
    /// Incremented by every mutation of the store.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Ordered, in-memory message list of the current session.
///
/// Mutations swap in a new snapshot, so readers always see either the
/// state before or after a mutation. Every mutation wakes subscribers.
#[derive(Debug)]
pub struct ConversationStore {
    state: watch::Sender<ConversationSnapshot>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConversationSnapshot::default());
        Self { state }
    }

    /// Adds `message` to the end of the conversation.
    pub fn append(&self, message: Message) {
        self.state.send_modify(|snapshot| {
            Arc::make_mut(&mut snapshot.messages).push(message);
            snapshot.revision += 1;
        });
    }

    /// Replaces the whole conversation in one step.
    pub(crate) fn replace_all(&self, messages: Vec<Message>) -> ConversationSnapshot {
        let mut written = ConversationSnapshot::default();
        self.state.send_modify(|snapshot| {
            snapshot.messages = Arc::new(messages);
            snapshot.revision += 1;
            written = snapshot.clone();
        });
        written
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.state.subscribe()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
