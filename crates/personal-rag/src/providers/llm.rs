//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;
use crate::generation::Prompt;

/// Trait for chat-completion answer generation
///
/// Implementations:
/// - `PerplexityClient`: Perplexity chat completions API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a system/user prompt pair and return the answer text
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
