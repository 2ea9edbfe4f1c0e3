//! Conversation state and the services that mutate it.

mod dispatcher;
mod store;
mod synchronizer;

pub use dispatcher::{MessageDispatcher, TurnOutcome, TurnReply};
pub use store::{ConversationSnapshot, ConversationStore};
pub use synchronizer::HistorySynchronizer;
