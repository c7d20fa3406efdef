//! LLM client trait

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{CompletionRequest, CompletionResponse};

/// A client that can complete a conversation
///
/// Implementations own transport-level retry for transient failures; callers
/// treat any surfaced error as "no reply available this turn".
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
