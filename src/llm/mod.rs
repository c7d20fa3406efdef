//! LLM client and plan generation
//!
//! Provides the completion client (OpenAI-compatible Chat Completions
//! dialect) and the [`Planner`] collaborator that turns a session into a
//! request and a model reply into a usable [`crate::machine::PlannerReply`].

use std::sync::Arc;

mod client;
mod error;
mod openai;
pub mod planner;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use planner::Planner;
pub use types::{ChatMessage, CompletionRequest, CompletionResponse, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client for the provider named in config
///
/// Any OpenAI-compatible endpoint works via the `openai` provider and a
/// custom base URL.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: openai",
            other
        ))),
    }
}
