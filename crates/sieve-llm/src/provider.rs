//! The enhancement capability interface.

use crate::error::LlmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token accounting reported by a provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Generated text plus optional provider metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

impl LlmResponse {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A language model backend: prompt text in, generated text out.
///
/// Transport, authentication and request shaping stay inside the
/// implementation. Callers treat any error as "no usable output".
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Registry key of this provider (e.g. `"ollama"`).
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> LlmResult<LlmResponse>;
}
