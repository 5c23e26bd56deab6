//! OpenAI-compatible chat completions client.

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, LlmResponse, TokenUsage};
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sieve_config::LlmConfig;
use std::time::Duration;
use tracing::debug;

/// Base URL used when `llm.host` still points at the local Ollama default.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable consulted when `llm.api_key` is unset.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Client for `/chat/completions` on OpenAI and compatible servers.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                LlmError::InvalidConfig(format!(
                    "llm.api_key is not set and {} is not in the environment",
                    API_KEY_ENV
                ))
            })?;

        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig("llm.model must not be empty".to_string()));
        }

        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: resolve_base_url(&config.host),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }

    /// Send a chat completion request.
    pub async fn chat(&self, request: &ChatCompletionRequest) -> LlmResult<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Chat completion with model {}", request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(format!("{}: {}", self.base_url, e))
                } else if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized(text),
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(text),
                StatusCode::NOT_FOUND => LlmError::ModelNotFound {
                    model: request.model.clone(),
                },
                _ => LlmError::ApiError {
                    status: status.as_u16(),
                    message: text,
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<LlmResponse> {
        let request = self.build_request(prompt);
        let response = self.chat(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        let model = if response.model.is_empty() {
            self.model.clone()
        } else {
            response.model
        };

        let mut result = LlmResponse::new(content, model);
        if let Some(usage) = response.usage {
            result = result.with_usage(TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }
        Ok(result)
    }
}

fn resolve_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host == LlmConfig::default().host {
        DEFAULT_OPENAI_BASE_URL.to_string()
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_default_host_maps_to_openai() {
        let client = OpenAiClient::from_config(&config_with_key()).unwrap();
        assert_eq!(client.base_url(), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(client.name(), "openai");
    }

    #[test]
    fn test_custom_host_is_kept() {
        let config = LlmConfig {
            host: "http://localhost:8000/v1/".to_string(),
            ..config_with_key()
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_request_shape() {
        let client = OpenAiClient::from_config(&config_with_key()).unwrap();
        let request = client.build_request("Clean this chunk");

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages, vec![ChatMessage::user("Clean this chunk")]);
        assert_eq!(request.max_tokens, Some(2048));
    }
}
