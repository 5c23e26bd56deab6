//! Sieve LLM - Language model providers for chunk refinement.
//!
//! Every backend implements [`LlmProvider`], a single text-in/text-out call.
//! [`ProviderRegistry`] maps the `llm.provider` config key to a constructor.

mod client;
mod error;
mod openai;
mod provider;
mod registry;
mod types;

pub use client::OllamaClient;
pub use error::{LlmError, LlmResult};
pub use openai::OpenAiClient;
pub use provider::{LlmProvider, LlmResponse, TokenUsage};
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use types::*;
