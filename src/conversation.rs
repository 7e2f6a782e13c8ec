//! Request validation and normalization.
//!
//! A [`Conversation`] can only be built through [`Conversation::from_json`],
//! so anything holding one may assume every turn has non-empty trimmed
//! content and that the final turn belongs to the user.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Reasons a chat request body is rejected. The display strings are returned
/// to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing 'messages' array")]
    MissingMessages,
    #[error("messages must be an array")]
    NotAnArray,
    #[error("Each message must have role 'user' or 'assistant' and content")]
    InvalidRole,
    #[error("Each message must have a string 'content'")]
    ContentNotString,
    #[error("Message content cannot be empty")]
    EmptyContent,
    #[error("Last message must be from the user")]
    LastNotUser,
}

/// Ordered, normalized chat history ending in a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    history: Vec<Message>,
    pending: Message,
}

impl Conversation {
    /// Validates a raw request body and trims every message.
    ///
    /// Structural checks run first, then per-message checks in list order,
    /// then the ordering check. An empty list passes the per-message checks
    /// and is rejected with [`ValidationError::LastNotUser`].
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let raw = body
            .as_object()
            .and_then(|obj| obj.get("messages"))
            .ok_or(ValidationError::MissingMessages)?
            .as_array()
            .ok_or(ValidationError::NotAnArray)?;

        let mut messages = raw
            .iter()
            .map(normalize_message)
            .collect::<Result<Vec<_>, _>>()?;

        match messages.pop() {
            Some(pending) if pending.role == Role::User => Ok(Self {
                history: messages,
                pending,
            }),
            _ => Err(ValidationError::LastNotUser),
        }
    }

    /// Every turn before the pending one.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The final user turn the provider is asked to answer.
    pub fn pending(&self) -> &Message {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.history.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().chain(std::iter::once(&self.pending))
    }

    pub fn to_messages(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }
}

fn normalize_message(raw: &Value) -> Result<Message, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::InvalidRole)?;
    let role = obj
        .get("role")
        .and_then(Role::parse)
        .ok_or(ValidationError::InvalidRole)?;
    let content = obj
        .get("content")
        .and_then(Value::as_str)
        .ok_or(ValidationError::ContentNotString)?
        .trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(Message {
        role,
        content: content.to_string(),
    })
}
