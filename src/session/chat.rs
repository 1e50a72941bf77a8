use crate::bus::{now_millis, ChatMessage};
use crate::error::ChatError;

/// Build a comment from user input.
///
/// Whitespace-only text or display names are rejected; the body is kept as typed.
pub fn compose_comment(user: &str, text: &str) -> Result<ChatMessage, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyText);
    }
    let user = user.trim();
    if user.is_empty() {
        return Err(ChatError::EmptyUser);
    }

    Ok(ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        user: user.to_string(),
        text: text.to_string(),
        timestamp: now_millis(),
    })
}

/// Append-only chat history for one session
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
