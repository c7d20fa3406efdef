//! Conversation log
//!
//! Ordered, append-only record of session turns kept for LLM context. The log
//! is never truncated by the core; callers that want a bounded view take
//! `recent(n)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    pub messages: Vec<Message>,
}

impl ConversationLog {
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::System, content));
    }

    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::User, content));
    }

    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, content));
    }

    /// Last `n` messages, for bounded LLM context
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
