//! Remote history records and their flattening into messages.

use super::message::Message;
use serde::{Deserialize, Serialize};

/// One completed turn as recorded by the remote store.
///
/// Either side may be missing; a partial turn is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl HistoryEntry {
    pub fn new(question: Option<&str>, answer: Option<&str>) -> Self {
        Self {
            question: question.map(str::to_string),
            answer: answer.map(str::to_string),
        }
    }
}

/// Flattens history entries into an ordered message sequence.
///
/// Each entry contributes its question as a user message, then its answer
/// as an assistant message. Absent or empty fields contribute nothing.
pub fn rebuild_messages(entries: &[HistoryEntry]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        if let Some(question) = present(&entry.question) {
            messages.push(Message::user(question));
        }
        if let Some(answer) = present(&entry.answer) {
            messages.push(Message::assistant(answer));
        }
    }
    messages
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|text| !text.is_empty())
}
