//! Conversation message types and history reconstruction.

pub mod history;
pub mod message;

pub use history::{HistoryEntry, rebuild_messages};
pub use message::{Message, MessageRole};
