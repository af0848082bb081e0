use serde::Serialize;
use thiserror::Error;

use crate::{Message, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidConversation {
    #[error("request body is not a list of messages: {0}")]
    Malformed(String),
    #[error("conversation is empty")]
    Empty,
    #[error("last message has no content")]
    EmptyLastMessage,
    #[error("last message must come from the user, got {0:?}")]
    LastMessageNotFromUser(Role),
}

/// A validated, non-empty chat history whose final turn is a user message
/// with content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Result<Self, InvalidConversation> {
        let last = messages.last().ok_or(InvalidConversation::Empty)?;
        if last.content.trim().is_empty() {
            return Err(InvalidConversation::EmptyLastMessage);
        }
        if last.role != Role::User {
            return Err(InvalidConversation::LastMessageNotFromUser(last.role));
        }
        Ok(Self { messages })
    }

    /// Decodes and validates a JSON array of `{role, content}` objects.
    pub fn from_json(body: &[u8]) -> Result<Self, InvalidConversation> {
        let messages: Vec<Message> = serde_json::from_slice(body)
            .map_err(|err| InvalidConversation::Malformed(err.to_string()))?;
        Self::new(messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn last(&self) -> &Message {
        // Non-empty by construction.
        &self.messages[self.messages.len() - 1]
    }

    /// Every turn before the latest user message.
    pub fn history(&self) -> &[Message] {
        &self.messages[..self.messages.len() - 1]
    }
}
