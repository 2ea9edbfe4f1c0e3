//! Application layer for SalesDesk.
//!
//! Owns the conversation state and coordinates the domain types from
//! `salesdesk-core` with an injected [`ChatBackend`](salesdesk_core::backend::ChatBackend):
//! initial history load, optimistic chat turns and reconciliation.

pub mod chat_session;
pub mod conversation;

#[cfg(test)]
mod testing;

pub use chat_session::ChatSession;
pub use conversation::{
    ConversationSnapshot, ConversationStore, HistorySynchronizer, MessageDispatcher, TurnOutcome,
    TurnReply,
};
