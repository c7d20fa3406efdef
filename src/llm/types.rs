//! LLM request/response types
//!
//! These model the OpenAI Chat Completions API but stay provider-agnostic:
//! any endpoint speaking that dialect works.

use crate::domain::{Message, Role};

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt, sent as the leading system message
    pub system_prompt: String,

    /// Conversation turns in order
    pub messages: Vec<ChatMessage>,

    /// Max tokens for the response
    pub max_tokens: u32,
}

/// One chat turn in provider-neutral form
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content, when the model produced any
    pub content: Option<String>,

    /// Token usage for cost awareness
    pub usage: TokenUsage,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
